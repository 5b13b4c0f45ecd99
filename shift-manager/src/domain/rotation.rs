use crate::domain::pattern_analyzer::RotationDescriptor;
use crate::domain::shift_catalog::{ShiftCatalog, ShiftDefinition};

/// この日数以上続いたシフトは反対区分へ切り替える
pub const SWITCH_AFTER_DAYS: u32 = 5;

/// 生成中のローテーション状態 (現在のシフトと連続日数)
///
/// 翌月生成と当月の自動補完で共通に使う。
#[derive(Debug, Clone)]
pub struct RotationCursor<'c> {
    catalog: &'c ShiftCatalog,
    shift_code: String,
    days_on_shift: u32,
    switch_after: u32,
}

impl<'c> RotationCursor<'c> {
    /// 最後の区間から引き継ぐ
    ///
    /// - 5日未満: 同じシフトを、それまでの日数を持ち越して継続
    /// - 5日以上: 反対区分のシフトへ切り替えて 0 から数える
    pub fn resume(descriptor: &RotationDescriptor, catalog: &'c ShiftCatalog) -> Self {
        let (shift_code, days_on_shift) = match descriptor.shift_rotations.last() {
            Some(run) if run.days < SWITCH_AFTER_DAYS => (run.shift_code.clone(), run.days),
            Some(run) => (catalog.alternate(&run.shift_code), 0),
            None => (descriptor.last_shift.clone(), 0),
        };

        // 平均が未設定(0)のときは 5 日
        let switch_after = match descriptor.average_days_per_shift {
            0 => SWITCH_AFTER_DAYS,
            n => n,
        };

        Self { catalog, shift_code, days_on_shift, switch_after }
    }

    pub fn shift_code(&self) -> &str {
        &self.shift_code
    }

    pub fn days_on_shift(&self) -> u32 {
        self.days_on_shift
    }

    pub fn switch_after(&self) -> u32 {
        self.switch_after
    }

    /// 出力できる勤務シフト。off区分やカタログ外のコードなら `None`
    pub fn working_shift(&self) -> Option<&'c ShiftDefinition> {
        self.catalog
            .lookup(&self.shift_code)
            .filter(|s| s.category.is_working())
    }

    /// 勤務を1日進める。切り替え日数に達したら区分を反転してリセット
    pub fn advance(&mut self) {
        self.days_on_shift += 1;
        if self.days_on_shift >= self.switch_after {
            self.shift_code = self.catalog.alternate(&self.shift_code);
            self.days_on_shift = 0;
        }
    }
}
