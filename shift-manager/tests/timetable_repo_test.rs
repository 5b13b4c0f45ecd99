mod tools;

#[cfg(test)]
mod timetable_repo_tests {
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    use shift_manager::domain::models::MonthKey;
    use shift_manager::domain::timetable_model::{EntryStatus, TimetableDocument, TimetableEntryRecord};
    use shift_manager::infrastructure::timetable_repo::TimetableRepository;

    use crate::tools;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create memory pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to create schema");

        pool
    }

    fn record(employee_id: i64, day: u32, code: &str, status: EntryStatus) -> TimetableEntryRecord {
        TimetableEntryRecord {
            employee_id,
            date: NaiveDate::from_ymd_opt(2025, 9, day).unwrap(),
            shift_code: code.to_string(),
            status,
            is_auto_assigned: false,
            notes: None,
        }
    }

    fn document(project: &str, entries: Vec<TimetableEntryRecord>) -> TimetableDocument {
        TimetableDocument {
            month: 9,
            year: 2025,
            project_name: project.to_string(),
            entries,
            created_by: "admin".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_find_month() {
        let repo = TimetableRepository::new(setup_test_db().await);
        let sept = MonthKey::new(2025, 9).unwrap();

        let mut holiday = record(2, 1, "OFF", EntryStatus::Holiday);
        holiday.notes = Some("national holiday".to_string());
        let doc = document(
            "Ops",
            vec![
                record(1, 1, "IST", EntryStatus::Scheduled),
                record(1, 2, "L", EntryStatus::Leave),
                holiday,
            ],
        );

        repo.save_month(&doc).await.unwrap();
        let loaded = repo.find_month("Ops", sept).await.unwrap().expect("saved month");

        tools::show_output::show_timetable_debug_data(&loaded);
        assert_eq!(loaded, doc);

        // 別プロジェクト・別月は無い
        assert!(repo.find_month("Other", sept).await.unwrap().is_none());
        assert!(repo
            .find_month("Ops", MonthKey::new(2025, 10).unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_whole_month() {
        let pool = setup_test_db().await;
        let repo = TimetableRepository::new(pool.clone());
        let sept = MonthKey::new(2025, 9).unwrap();

        let first = repo
            .save_month(&document("Ops", vec![
                record(1, 1, "IST", EntryStatus::Scheduled),
                record(1, 2, "IST", EntryStatus::Scheduled),
            ]))
            .await
            .unwrap();
        let mut second_doc = document("Ops", vec![record(1, 3, "AU", EntryStatus::Scheduled)]);
        second_doc.created_by = "someone else".to_string();
        let second = repo.save_month(&second_doc).await.unwrap();

        // 同じ (month, year, project) は同じ行
        assert_eq!(first, second);
        let loaded = repo.find_month("Ops", sept).await.unwrap().unwrap();
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.created_by, "someone else");

        let headers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timetables")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(headers, 1);
    }

    #[tokio::test]
    async fn test_list_and_delete_months() {
        let pool = setup_test_db().await;
        let repo = TimetableRepository::new(pool.clone());

        repo.save_month(&document("Ops", vec![record(1, 1, "IST", EntryStatus::Scheduled)]))
            .await
            .unwrap();
        let mut october = document("Ops", vec![]);
        october.month = 10;
        repo.save_month(&october).await.unwrap();
        repo.save_month(&document("Other", vec![])).await.unwrap();

        let months = repo.list_months("Ops").await.unwrap();
        let keys: Vec<String> = months.iter().map(|m| m.month.to_string()).collect();
        assert_eq!(keys, vec!["2025-10", "2025-09"]);
        assert_eq!(months[1].entry_count, 1);
        assert_eq!(months[0].entry_count, 0);

        // Cascade で子も消える
        let sept = MonthKey::new(2025, 9).unwrap();
        assert!(repo.delete_month("Ops", sept).await.unwrap());
        assert!(!repo.delete_month("Ops", sept).await.unwrap());

        let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timetable_entries")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(entries, 0);
    }
}
