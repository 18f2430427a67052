use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const BASIC_SHARE: f64 = 0.50;
const HRA_SHARE_OF_BASIC: f64 = 0.40;
const PF_SHARE_OF_BASIC: f64 = 0.12;
const PROFESSIONAL_TAX: f64 = 200.0;
const PROFESSIONAL_TAX_THRESHOLD: f64 = 15_000.0;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SalarySlip {
    pub id: u64,
    pub employee_id: u64,
    /// First day of the pay month.
    #[schema(value_type = String, format = "date", example = "2026-09-01")]
    pub month: NaiveDate,
    pub monthly_salary: f64,
    pub basic: f64,
    pub hra: f64,
    pub special_allowance: f64,
    pub bonus: f64,
    pub provident_fund: f64,
    pub professional_tax: f64,
    pub other_deductions: f64,
    pub lwp_days: f64,
    pub lwp_deduction: f64,
    pub gross: f64,
    pub net: f64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlipInputs {
    pub monthly_salary: f64,
    pub bonus: f64,
    pub other_deductions: f64,
    pub lwp_days: f64,
    pub days_in_month: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SlipFigures {
    pub basic: f64,
    pub hra: f64,
    pub special_allowance: f64,
    pub provident_fund: f64,
    pub professional_tax: f64,
    pub lwp_deduction: f64,
    pub gross: f64,
    pub total_deductions: f64,
    pub net: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl SlipInputs {
    pub fn compute(&self) -> SlipFigures {
        let salary = self.monthly_salary.max(0.0);
        let basic = round2(salary * BASIC_SHARE);
        let hra = round2(basic * HRA_SHARE_OF_BASIC);
        let special_allowance = round2(salary - basic - hra);
        let provident_fund = round2(basic * PF_SHARE_OF_BASIC);

        let gross = round2(salary + self.bonus.max(0.0));
        let professional_tax = if gross > PROFESSIONAL_TAX_THRESHOLD { PROFESSIONAL_TAX } else { 0.0 };

        let lwp_deduction = if self.days_in_month == 0 {
            0.0
        } else {
            round2(salary / f64::from(self.days_in_month) * self.lwp_days.max(0.0))
        };

        let total_deductions =
            round2(provident_fund + professional_tax + self.other_deductions.max(0.0) + lwp_deduction);
        let net = round2((gross - total_deductions).max(0.0));

        SlipFigures {
            basic,
            hra,
            special_allowance,
            provident_fund,
            professional_tax,
            lwp_deduction,
            gross,
            total_deductions,
            net,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_salary_into_components() {
        let figures = SlipInputs {
            monthly_salary: 50_000.0,
            bonus: 5_000.0,
            other_deductions: 1_000.0,
            lwp_days: 0.0,
            days_in_month: 30,
        }
        .compute();

        assert_eq!(figures.basic, 25_000.0);
        assert_eq!(figures.hra, 10_000.0);
        assert_eq!(figures.special_allowance, 15_000.0);
        assert_eq!(figures.provident_fund, 3_000.0);
        assert_eq!(figures.professional_tax, 200.0);
        assert_eq!(figures.gross, 55_000.0);
        assert_eq!(figures.total_deductions, 4_200.0);
        assert_eq!(figures.net, 50_800.0);
    }

    #[test]
    fn lwp_prorates_by_days_in_month() {
        let figures = SlipInputs {
            monthly_salary: 31_000.0,
            bonus: 0.0,
            other_deductions: 0.0,
            lwp_days: 2.0,
            days_in_month: 31,
        }
        .compute();

        assert_eq!(figures.lwp_deduction, 2_000.0);
    }

    #[test]
    fn low_salary_skips_professional_tax_and_floors_net() {
        let figures = SlipInputs {
            monthly_salary: 10_000.0,
            bonus: 0.0,
            other_deductions: 20_000.0,
            lwp_days: 0.0,
            days_in_month: 30,
        }
        .compute();

        assert_eq!(figures.professional_tax, 0.0);
        assert_eq!(figures.net, 0.0);
    }
}
