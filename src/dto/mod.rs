pub mod assessment_dto;
pub mod invite_dto;
pub mod recruiter_code_dto;
