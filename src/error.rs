/// Converts a `Result` into an `Option`, logging the error on the way.
///
/// Metric files going missing is the common case on most hosts, so the error is
/// logged at debug level only.
pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::debug!("{err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_log_passes_value_through() {
        let res: Result<u64, std::io::Error> = Ok(7);
        assert_eq!(res.ok_log(), Some(7));
    }

    #[test]
    fn test_ok_log_swallows_error() {
        let res: Result<u64, std::io::Error> = Err(std::io::Error::other("boom"));
        assert_eq!(res.ok_log(), None);
    }
}
