use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("requested entry {index} but only {count} are queued")]
    IndexBeyondCount { index: usize, count: usize },
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
