pub mod assessment;
pub mod invite_token;
pub mod question;
pub mod user;
pub mod user_assessment;
