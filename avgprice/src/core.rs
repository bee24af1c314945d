pub mod record;

pub mod key;

pub mod aggregate;

pub mod partition;

pub mod mapper;

pub mod reducer;

pub mod executor;
