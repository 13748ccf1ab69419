pub mod conversion_repository;

pub use conversion_repository::ConversionRepository;
