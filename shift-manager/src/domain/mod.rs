pub mod assignment;
pub mod entry_store;
pub mod models;
pub mod month_generator;
pub mod month_view;
pub mod pattern_analyzer;
pub mod rotation;
pub mod round_robin;
pub mod schedule_engine;
pub mod shift_catalog;
pub mod timetable_model;
