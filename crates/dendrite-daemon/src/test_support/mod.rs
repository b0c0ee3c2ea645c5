//! Test doubles for use-case and handler tests.

mod mock_repository;

pub use mock_repository::MockSimRepository;
