pub mod job_routes;
pub mod webhook_routes;
