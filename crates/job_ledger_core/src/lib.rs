pub mod allocation;
pub mod domain;
pub mod payment;
pub mod ports;
pub mod reports;
pub mod schedule;

pub use domain::{
    ClientContact, ClientCredentials, ClientDecision, DeductionFilter, DeductionLog, Job,
    JobUpdate, NewJob, NewTask, NewUser, ProgressStatus, Role, Task, TaskChange, TaskFilter,
    TaskType, TaskUpdate, User, UserCredentials,
};
pub use ports::{DatabaseService, PortError, PortResult};
