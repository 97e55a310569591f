pub mod inmemory_repo;
