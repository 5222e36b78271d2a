//! different utility modules used throughout the project
/// typed publish/subscribe channel used for solver notifications
pub mod event_bus;
/// logger setup and saving solution into csv file
pub mod logger;
/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" into HashMap
pub mod task_parser;
