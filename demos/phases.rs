//! Walks an arena through a few "frames": allocate, inspect, reset, repeat.
//! Run with `cargo run --example phases`.

use std::ptr::NonNull;

use lzarena::{Arena, Status, page_size};

fn log_alloc(label: &str, addr: Option<NonNull<u8>>, size: usize) {
    println!("[{label}] requested {size} bytes, received {addr:?}");
}

fn main() {
    let mut arena = Arena::new();

    let status = Status::from(arena.append_region(page_size()));
    println!("pre-sized head region: status {}", status.code());

    for frame in 0..3 {
        println!("\n--- frame {frame} ---");

        for (index, size) in [100, 100, 100].into_iter().enumerate() {
            let addr = arena.alloc_align(16, size);
            log_alloc(&format!("object {index}"), addr, size);
        }

        // Bigger than what is left in the head: the cursor moves on or grows.
        let big = page_size() * 2;
        log_alloc("big", arena.calloc(big), big);

        let report = arena.report();
        println!(
            "used_memory = {}, report = {report}, regions = {}",
            arena.used_memory(),
            arena.region_count()
        );

        arena.free_all();
        println!("after free_all: report = {}", arena.report());
    }
}
