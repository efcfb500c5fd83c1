pub mod cargo_env {
    pub const CARGO_PKG_NAME: &str = env!("CARGO_PKG_NAME");
}

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURES: i32 = 1;
    pub const FOCUSED: i32 = 2;
    pub const SETUP: i32 = 3;
    pub const INTERRUPTED: i32 = 130;
}

pub mod defaults {
    use std::time::Duration;

    /// How long a finished run waits for timed out bodies to report late failures.
    pub const LATE_FAILURE_GRACE: Duration = Duration::from_secs(2);
}
