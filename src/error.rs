use thiserror::Error;

/// Reasons a region could not be acquired from a [`crate::Backend`].
///
/// Allocation requests themselves never produce this type: they signal failure
/// with `None`. Only the paths that acquire fresh memory ([`crate::Region::create`]
/// and [`crate::Arena::append_region`]) report why they failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The backend could not provide `size` bytes.
    #[error("backend could not provide {size} bytes")]
    BackendExhausted { size: usize },

    /// A size computation (page rounding, growth factor or alignment padding)
    /// does not fit in a `usize`.
    #[error("requested size {size} overflows when rounded for a region")]
    SizeOverflow { size: usize },

    /// A backend returned descriptor memory that is not aligned to `align`.
    #[error("backend returned a region descriptor not aligned to {align} bytes")]
    MisalignedDescriptor { align: usize },
}

/// Status codes for the region-append path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    AllocFailure = 1,
}

impl Status {
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl<T> From<Result<T, AllocError>> for Status {
    fn from(result: Result<T, AllocError>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(_) => Status::AllocFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::AllocFailure.code(), 1);
    }

    #[test]
    fn status_from_result() {
        let ok: Result<(), AllocError> = Ok(());
        let err: Result<(), AllocError> = Err(AllocError::BackendExhausted { size: 4096 });

        assert_eq!(Status::from(ok), Status::Ok);
        assert_eq!(Status::from(err), Status::AllocFailure);
    }

    #[test]
    fn messages_name_the_size() {
        let err = AllocError::BackendExhausted { size: 8192 };
        assert_eq!(err.to_string(), "backend could not provide 8192 bytes");
    }
}
