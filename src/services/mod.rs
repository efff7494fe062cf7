pub mod feed_service;
pub mod job_bank_service;
pub mod job_store_service;
pub mod prefetch_service;
pub mod search_service;
