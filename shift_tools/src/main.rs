use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use shift_manager::application::commands::{self, open_services};
use shift_manager::application::config::AppConfig;
use shift_manager::application::dto::{to_csv, MonthExportDto};
use shift_manager::application::time::{parse_date, parse_day_list};
use shift_manager::domain::assignment::{AssignmentRequest, DistributionMode};
use shift_manager::domain::models::{EmployeeId, MonthKey, NewEmployee, WeekOffPattern};
use shift_manager::domain::round_robin::RoundRobinRequest;
use shift_manager::domain::schedule_engine::{CellEdit, ScheduleEngine};
use shift_manager::domain::shift_catalog::{ShiftCategory, ShiftDefinition};
use shift_manager::error::ScheduleError;
use shift_manager::AppServices;

mod state;

// 引数を構造体として定義します
#[derive(Parser)]
#[command(name = "shift_tools")]
#[command(version)]
#[command(about = "月ごとのシフト表を編集・生成・出力します", long_about = None)]
struct Cli {
    /// スケジュールの状態ファイル (JSON)
    #[arg(short, long, global = true, default_value = "schedule.json")]
    state: PathBuf,

    /// 設定ファイル (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// 空の状態ファイルを作ります
    Init {
        /// 表示する月 (yyyy-mm)。省略時は今月
        #[arg(short, long)]
        month: Option<MonthKey>,

        #[arg(long)]
        force: bool,
    },

    /// 従業員を追加します
    AddEmployee {
        name: String,

        #[arg(short, long, default_value = "")]
        position: String,

        /// sat-sun / mon-tue / thu-fri
        #[arg(short, long, default_value = "sat-sun")]
        week_off: WeekOffPattern,

        /// 1日の勤務時間。省略時は設定値
        #[arg(long)]
        hours: Option<u32>,
    },

    /// 従業員の情報を書き換えます (省略した項目はそのまま)
    UpdateEmployee {
        id: EmployeeId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        position: Option<String>,

        #[arg(long)]
        week_off: Option<WeekOffPattern>,

        #[arg(long)]
        hours: Option<u32>,
    },

    /// 従業員とその全エントリを削除します
    RemoveEmployee { id: EmployeeId },

    /// 1マスを編集します (コード省略でクリア)
    SetCell {
        employee: EmployeeId,

        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,

        code: Option<String>,
    },

    /// 期間を休暇 (L) にします
    Leave {
        employee: EmployeeId,
        #[arg(value_parser = parse_date_arg)]
        start: NaiveDate,
        #[arg(value_parser = parse_date_arg)]
        end: NaiveDate,
    },

    /// 期間を週休 (WO) にします
    WeekOff {
        employee: EmployeeId,
        #[arg(value_parser = parse_date_arg)]
        start: NaiveDate,
        #[arg(value_parser = parse_date_arg)]
        end: NaiveDate,
    },

    /// 期間にシフトを一括で割り当てます
    Assign {
        employee: EmployeeId,
        shift: String,
        #[arg(value_parser = parse_date_arg)]
        start: NaiveDate,
        #[arg(value_parser = parse_date_arg)]
        end: NaiveDate,

        /// 指定した日だけに割り当てる ("3,7,10-12")。省略時は週休以外の全日
        #[arg(short, long)]
        days: Option<String>,

        /// 既存のエントリの上書きを確認済みとする
        #[arg(short, long)]
        yes: bool,

        /// 3件以上割り当てたら、続けて月の残りを自動で埋める
        #[arg(long)]
        auto_fill: bool,
    },

    /// 入力済みのシフトの続きで、月の残りを埋めます
    AutoFill {
        employee: EmployeeId,
        #[arg(short, long)]
        month: Option<MonthKey>,
    },

    /// 翌月へ移動します (必要なら翌月を自動生成)
    NextMonth,

    /// 前月へ移動します
    PrevMonth,

    /// 従業員ごとのローテーションを表示します
    Analyze {
        #[arg(short, long)]
        month: Option<MonthKey>,
    },

    /// 月の集計を表示します
    Summary {
        #[arg(short, long)]
        month: Option<MonthKey>,
    },

    /// 月のシフト表を出力します
    Export {
        #[arg(short, long)]
        month: Option<MonthKey>,

        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// 順番割り当てで月を埋めます
    RoundRobin {
        /// 割り当てるシフトコード
        #[arg(short = 'S', long, value_delimiter = ',', required = true)]
        shifts: Vec<String>,

        /// 対象の従業員ID。省略時は全員
        #[arg(short, long, value_delimiter = ',')]
        employees: Vec<EmployeeId>,

        #[arg(short, long)]
        month: Option<MonthKey>,

        /// 5 なら土日を飛ばす
        #[arg(short, long, default_value_t = 5)]
        work_days: u32,
    },

    /// 月をDBへ保存します
    Push {
        #[arg(short, long)]
        month: Option<MonthKey>,
        #[arg(short, long)]
        project: Option<String>,
    },

    /// DBから月を読み込みます (シフト定義と従業員も読み直す)
    Pull {
        #[arg(short, long)]
        month: Option<MonthKey>,
        #[arg(short, long)]
        project: Option<String>,
    },

    /// DBに保存済みの月を一覧します
    Months {
        #[arg(short, long)]
        project: Option<String>,
    },

    /// DBに保存済みの月を削除します
    DeleteMonth {
        month: MonthKey,
        #[arg(short, long)]
        project: Option<String>,
    },

    /// DBのシフト定義を管理します
    Shift {
        #[command(subcommand)]
        action: ShiftAction,
    },
}

#[derive(Subcommand)]
enum ShiftAction {
    /// 有効なシフト定義を表示します
    List,

    /// シフトを追加します
    Add {
        code: String,
        name: String,

        /// morning / night / off
        #[arg(long)]
        category: ShiftCategory,

        #[arg(long, default_value = "#607D8B")]
        color: String,

        #[arg(long, default_value = "")]
        time: String,
    },

    /// シフトを書き換えます (省略した項目はそのまま)
    Update {
        code: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        category: Option<ShiftCategory>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        time: Option<String>,
    },

    /// シフトを無効にします (L / WO / OFF は不可)
    Remove { code: String },

    /// 空のDBに標準のシフト定義を登録します
    InitDefaults,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn this_month() -> MonthKey {
    MonthKey::of(Local::now().date_naive())
}

fn init_tracing(config: &AppConfig) {
    // ログは stderr (stdout は出力データ用)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = AppConfig::load(args.config.as_deref()).context("設定を読み込めませんでした")?;
    init_tracing(&config);

    run(args, &config).await
}

async fn run(args: Cli, config: &AppConfig) -> anyhow::Result<()> {
    let path = args.state.as_path();

    // 3. パターンマッチで分岐処理
    match args.command {
        Commands::Init { month, force } => {
            let month = month.unwrap_or_else(this_month);
            state::init(path, month, force)?;
            println!("{} を作成しました ({})", path.display(), month);
        }

        Commands::AddEmployee { name, position, week_off, hours } => {
            let mut engine = state::load(path)?;
            let employee = engine.add_employee(NewEmployee {
                name,
                position,
                week_off_pattern: week_off,
                working_hours: hours.unwrap_or(config.schedule.default_working_hours),
            })?;
            state::save(path, &engine)?;
            println!("追加しました: [{}] {}", employee.id, employee.name);
        }

        Commands::UpdateEmployee { id, name, position, week_off, hours } => {
            let mut engine = state::load(path)?;
            let mut employee = engine.employee(id)?.clone();
            if let Some(name) = name {
                employee.name = name;
            }
            if let Some(position) = position {
                employee.position = position;
            }
            if let Some(week_off) = week_off {
                employee.week_off_pattern = week_off;
            }
            if let Some(hours) = hours {
                employee.working_hours = hours;
            }
            let updated = engine.update_employee(employee)?;
            state::save(path, &engine)?;
            println!("更新しました: [{}] {}", updated.id, updated.name);
        }

        Commands::RemoveEmployee { id } => {
            let mut engine = state::load(path)?;
            let removed = engine.delete_employee(id)?;
            state::save(path, &engine)?;
            // DB 側は次の push で全月分まとめて消える
            println!("従業員 {id} を削除しました (エントリ {removed} 件)");
        }

        Commands::SetCell { employee, date, code } => {
            let mut engine = state::load(path)?;
            let edit = engine.set_cell(employee, date, code.as_deref().unwrap_or(""))?;
            state::save(path, &engine)?;
            match edit {
                CellEdit::Set { entry, follow_on_off } => {
                    println!("{} {} -> {}", entry.employee_id, entry.date, entry.shift_code);
                    if let Some(off) = follow_on_off {
                        println!("  翌日 {off} に OFF を追加しました");
                    }
                }
                CellEdit::Cleared(Some(old)) => println!("{} {} をクリアしました ({})", old.employee_id, old.date, old.shift_code),
                CellEdit::Cleared(None) => println!("エントリはありません"),
            }
        }

        Commands::Leave { employee, start, end } => {
            let mut engine = state::load(path)?;
            let written = engine.add_leave(employee, start, end)?;
            state::save(path, &engine)?;
            println!("休暇を {written} 日追加しました");
        }

        Commands::WeekOff { employee, start, end } => {
            let mut engine = state::load(path)?;
            let written = engine.add_week_off(employee, start, end)?;
            state::save(path, &engine)?;
            println!("週休を {written} 日追加しました");
        }

        Commands::Assign { employee, shift, start, end, days, yes, auto_fill } => {
            let mut engine = state::load(path)?;
            let mode = match days {
                Some(list) => DistributionMode::Manual(parse_day_list(&list)?),
                None => DistributionMode::Auto,
            };
            let request = AssignmentRequest { employee_id: employee, shift_code: shift, start, end, mode };
            assign(&mut engine, &request, yes, auto_fill)?;
            state::save(path, &engine)?;
        }

        Commands::AutoFill { employee, month } => {
            let mut engine = state::load(path)?;
            let month = month.unwrap_or(engine.current_month());
            let filled = engine.auto_fill_remaining(employee, month)?;
            state::save(path, &engine)?;
            if filled.is_empty() {
                println!("埋める日がありません (勤務エントリが3件以上必要です)");
            } else {
                println!("{} 日を自動で埋めました", filled.len());
            }
        }

        Commands::NextMonth => {
            let mut engine = state::load(path)?;
            let generated = engine.advance_month()?;
            state::save(path, &engine)?;
            println!("{} へ移動しました (自動生成 {generated} 件)", engine.current_month());
        }

        Commands::PrevMonth => {
            let mut engine = state::load(path)?;
            let month = engine.previous_month()?;
            state::save(path, &engine)?;
            println!("{month} へ移動しました");
        }

        Commands::Analyze { month } => {
            let engine = state::load(path)?;
            let month = month.unwrap_or(engine.current_month());
            let patterns = engine.analyze_patterns(month);
            if patterns.is_empty() {
                println!("{month}: 継続できるパターンはありません");
            }
            for (id, pattern) in &patterns {
                let runs: Vec<String> = pattern.shift_rotations.iter().map(|r| r.to_string()).collect();
                println!(
                    "[{id}] last={} runs=[{}] avg={} total={}",
                    pattern.last_shift,
                    runs.join(", "),
                    pattern.average_days_per_shift,
                    pattern.total_working_days
                );
            }
        }

        Commands::Summary { month } => {
            let engine = state::load(path)?;
            let month = month.unwrap_or(engine.current_month());
            println!("{}", serde_json::to_string_pretty(&engine.month_summary(month))?);
        }

        Commands::Export { month, format, out } => {
            let engine = state::load(path)?;
            let month = month.unwrap_or(engine.current_month());
            let body = match format {
                ExportFormat::Csv => to_csv(&engine.month_grid(month)),
                ExportFormat::Json => serde_json::to_string_pretty(&MonthExportDto::new(
                    engine.month_grid(month),
                    engine.month_summary(month),
                    engine.catalog(),
                ))?,
            };
            write_output(out.as_deref(), &body)?;
        }

        Commands::RoundRobin { shifts, employees, month, work_days } => {
            let mut engine = state::load(path)?;
            let request = RoundRobinRequest {
                month: month.unwrap_or(engine.current_month()),
                shift_codes: shifts,
                work_days_per_week: work_days,
            };
            let ids: Vec<EmployeeId> = if employees.is_empty() {
                engine.employees().iter().map(|e| e.id).collect()
            } else {
                employees
            };
            let written = engine.generate_round_robin(&request, &ids)?;
            state::save(path, &engine)?;
            println!("{} に {written} 件割り当てました", request.month);
        }

        Commands::Push { month, project } => {
            let engine = state::load(path)?;
            let month = month.unwrap_or(engine.current_month());
            let project = project.unwrap_or_else(|| config.schedule.project_name.clone());

            let services = open_services(&config.database).await?;
            let id = commands::push_month(&services, &engine, &project, &config.schedule.created_by, month).await?;
            println!("{project} {month} を保存しました (timetable {id})");
        }

        Commands::Pull { month, project } => {
            let mut engine = state::load(path)?;
            let month = month.unwrap_or(engine.current_month());
            let project = project.unwrap_or_else(|| config.schedule.project_name.clone());

            let services = open_services(&config.database).await?;
            let loaded = commands::pull_month(&services, &mut engine, &project, month).await?;
            engine.set_current_month(month);
            state::save(path, &engine)?;
            println!("{project} {month} を読み込みました ({loaded} 件)");
        }

        Commands::Months { project } => {
            let project = project.unwrap_or_else(|| config.schedule.project_name.clone());
            let services = open_services(&config.database).await?;
            let months = commands::list_months(&services, &project).await?;
            if months.is_empty() {
                println!("{project}: 保存済みの月はありません");
            }
            for saved in &months {
                println!("{}  {:>4} 件  ({})", saved.month, saved.entry_count, saved.created_by);
            }
        }

        Commands::DeleteMonth { month, project } => {
            let project = project.unwrap_or_else(|| config.schedule.project_name.clone());
            let services = open_services(&config.database).await?;
            if commands::delete_month(&services, &project, month).await? {
                println!("{project} {month} を削除しました");
            } else {
                println!("{project} {month} は保存されていません");
            }
        }

        Commands::Shift { action } => {
            let services = open_services(&config.database).await?;
            shift_command(&services, action).await?;
        }
    }

    Ok(())
}

async fn shift_command(services: &AppServices, action: ShiftAction) -> anyhow::Result<()> {
    match action {
        ShiftAction::List => {
            let catalog = commands::load_catalog(services).await?;
            for shift in catalog.iter() {
                println!(
                    "{:<8} {:<16} {:<8} {:<16} {}",
                    shift.code,
                    shift.name,
                    shift.category.as_str(),
                    shift.time,
                    shift.color
                );
            }
            return Ok(());
        }

        ShiftAction::Add { code, name, category, color, time } => {
            let shift = ShiftDefinition::new(&name, &code, &time, &color, category);
            commands::add_shift(services, &shift).await?;
            println!("シフト {code} を追加しました");
        }

        ShiftAction::Update { code, name, category, color, time } => {
            let mut shift = services
                .shifts
                .find(&code)
                .await?
                .with_context(|| format!("シフト '{code}' は登録されていません"))?;
            if let Some(name) = name {
                shift.name = name;
            }
            if let Some(category) = category {
                shift.category = category;
            }
            if let Some(color) = color {
                shift.color = color;
            }
            if let Some(time) = time {
                shift.time = time;
            }
            commands::update_shift(services, &shift).await?;
            println!("シフト {code} を更新しました");
        }

        ShiftAction::Remove { code } => {
            commands::remove_shift(services, &code).await?;
            println!("シフト {code} を無効にしました");
        }

        ShiftAction::InitDefaults => {
            let inserted = commands::initialize_default_shifts(services).await?;
            if inserted == 0 {
                println!("シフト定義は既に登録されています");
                return Ok(());
            }
            println!("標準のシフト定義を {inserted} 件登録しました");
        }
    }

    println!("状態ファイルに反映するには pull を実行してください");
    Ok(())
}

/// plan → (確認) → commit → (自動補完)
fn assign(
    engine: &mut ScheduleEngine,
    request: &AssignmentRequest,
    confirmed: bool,
    auto_fill: bool,
) -> anyhow::Result<()> {
    let plan = engine.plan_assignment(request)?;

    if plan.has_conflicts() && !confirmed {
        let dates: Vec<String> = plan.conflict_dates().iter().map(|d| d.to_string()).collect();
        println!("既存のエントリが {} 件あります: {}", dates.len(), dates.join(", "));
        println!("上書きする場合は --yes を付けて再実行してください");
        return Err(ScheduleError::OverwriteNotConfirmed { conflicts: dates.len() }.into());
    }

    let month = plan.month;
    let outcome = engine.commit_assignment(plan, confirmed)?;
    println!("{} 件割り当てました (上書き {} 件)", outcome.assigned, outcome.replaced);
    for off in &outcome.follow_on_offs {
        println!("  翌日 {off} に OFF を追加しました");
    }

    if outcome.auto_fill_available {
        if auto_fill {
            let filled = engine.auto_fill_remaining(request.employee_id, month)?;
            println!("月の残り {} 日を自動で埋めました", filled.len());
        } else {
            println!("ヒント: --auto-fill で月の残りを自動で埋められます");
        }
    }
    Ok(())
}

fn write_output(out: Option<&Path>, body: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            fs::write(path, body)
                .with_context(|| format!("ファイル '{}' の書き込みに失敗しました", path.display()))?;
            println!("{} に出力しました", path.display());
        }
        None => print!("{body}"),
    }
    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use shift_manager::domain::shift_catalog::ShiftCatalog;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_assign_with_days() {
        let cli = Cli::parse_from([
            "shift_tools", "--state", "s.json", "assign", "1", "IST", "2025-09-01", "10/9/2025",
            "--days", "3,7", "--yes",
        ]);
        match cli.command {
            Commands::Assign { employee, shift, end, days, yes, auto_fill, .. } => {
                assert_eq!(employee, 1);
                assert_eq!(shift, "IST");
                assert_eq!(end, NaiveDate::from_ymd_opt(2025, 9, 10).unwrap());
                assert_eq!(days.as_deref(), Some("3,7"));
                assert!(yes);
                assert!(!auto_fill);
            }
            _ => panic!("expected assign"),
        }
    }

    #[test]
    fn parses_shift_add() {
        let cli = Cli::parse_from([
            "shift_tools", "shift", "add", "D", "Day Shift", "--category", "Morning", "--color", "#123456",
        ]);
        match cli.command {
            Commands::Shift { action: ShiftAction::Add { code, name, category, color, time } } => {
                assert_eq!(code, "D");
                assert_eq!(name, "Day Shift");
                assert_eq!(category, ShiftCategory::Morning);
                assert_eq!(color, "#123456");
                assert_eq!(time, "");
            }
            _ => panic!("expected shift add"),
        }

        assert!(Cli::try_parse_from(["shift_tools", "shift", "add", "D", "Day", "--category", "evening"]).is_err());
    }

    #[test]
    fn assign_without_yes_writes_nothing_on_conflict() {
        let month = MonthKey::new(2025, 9).unwrap();
        let mut engine = ScheduleEngine::new(ShiftCatalog::standard(), month);
        let alice = engine
            .add_employee(NewEmployee {
                name: "Alice".to_string(),
                position: String::new(),
                week_off_pattern: WeekOffPattern::SatSun,
                working_hours: 8,
            })
            .unwrap();
        engine.set_cell(alice.id, month.date(2).unwrap(), "L").unwrap();

        let request = AssignmentRequest {
            employee_id: alice.id,
            shift_code: "IST".to_string(),
            start: month.date(1).unwrap(),
            end: month.date(5).unwrap(),
            mode: DistributionMode::Auto,
        };
        assert!(assign(&mut engine, &request, false, true).is_err());
        assert_eq!(engine.month_entries(month).len(), 1);

        assign(&mut engine, &request, true, true).unwrap();
        // 1-5 日 + 月の残り (6-30 日)
        assert_eq!(engine.month_entries(month).len(), 30);
    }
}
