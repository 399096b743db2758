/// Request and response types of the REST endpoints
pub mod dto;
