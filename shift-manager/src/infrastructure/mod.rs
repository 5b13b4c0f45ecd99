pub mod employee_repo;
pub mod shift_repo;
pub mod timetable_repo;
