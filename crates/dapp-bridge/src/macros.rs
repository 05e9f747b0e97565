/// A `info!` helper for the one-line request summaries shown to the user.
///
/// These go to [`BRIDGE_USER_LOG_TARGET`](crate::logging::BRIDGE_USER_LOG_TARGET) and can be
/// switched off at runtime through [`LoggingManager`](crate::logging::LoggingManager).
macro_rules! bridge_info {
    ($($arg:tt)*) => {
        tracing::info!(target: $crate::logging::BRIDGE_USER_LOG_TARGET, $($arg)*);
    };
}

pub(crate) use bridge_info;
