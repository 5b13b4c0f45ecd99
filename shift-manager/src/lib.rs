pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

use sqlx::SqlitePool;

use infrastructure::employee_repo::EmployeeRepository;
use infrastructure::shift_repo::ShiftRepository;
use infrastructure::timetable_repo::TimetableRepository;

// 全てのリポジトリを保持するコンテナ
pub struct AppServices {
    pub employees: EmployeeRepository,
    pub shifts: ShiftRepository,
    pub timetables: TimetableRepository,
}

impl AppServices {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            // poolは内部で参照カウントされているのでcloneしても低コスト
            employees: EmployeeRepository::new(pool.clone()),
            shifts: ShiftRepository::new(pool.clone()),
            timetables: TimetableRepository::new(pool),
        }
    }
}
