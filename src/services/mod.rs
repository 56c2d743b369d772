pub mod assignment_service;
pub mod attempt_service;
pub mod code_service;
pub mod grading_service;
pub mod invite_service;
pub mod linking_service;
pub mod notification_service;
pub mod user_service;
