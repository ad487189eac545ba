pub mod forex_factory;
