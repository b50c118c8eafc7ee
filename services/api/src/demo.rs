use crate::infra::{accrual_policy, build_service, open_data_file};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use clap::Args;
use dataverse::config::AppConfig;
use dataverse::contracts::{
    AccrualFilter, AuthorTerms, CommissionType, ContentFormat, ContractFilter, ContractTerms,
    ContractorKind, Currency, NewAccrual, NewAuthorContent, NewContract, NewContractor,
    NewPaymentScheme, PaymentSchedule, PresenterHourlyTerms, PresenterRole,
};
use dataverse::error::AppError;
use dataverse::ids::{ContentId, ContractId, PaymentSchemeId};
use dataverse::store::{DatasetRepository, MemoryRepository};
use dataverse::threads::{NewEducationThread, ThreadFilter};
use dataverse::views::{DataverseSummary, StatusCount};
use dataverse::{DataverseService, ServiceError};
use rust_decimal::Decimal;
use std::fs::File;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// JSON data file (defaults to DATAVERSE_DATA_PATH)
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// Evaluate statuses at this instant (YYYY-MM-DD or RFC 3339). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_instant)]
    pub(crate) at: Option<DateTime<Utc>>,
    /// List every contract, accrual and thread below the summary
    #[arg(long)]
    pub(crate) list: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// JSON data file receiving the accruals (defaults to DATAVERSE_DATA_PATH)
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// Ledger CSV export with Contract, Amount, Confirmed At, Paid At and Comment columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reporting date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs { data, at, list } = args;
    let config = AppConfig::load()?;
    let repository = open_data_file(data, &config)?;
    let path = repository.path().to_path_buf();
    let service = build_service(repository, accrual_policy(&config), at);

    println!("Dataverse report for {}", path.display());
    render(&service, list)
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let ImportArgs { data, csv } = args;
    let config = AppConfig::load()?;
    let repository = open_data_file(data, &config)?;
    let path = repository.path().to_path_buf();
    let service = build_service(repository, accrual_policy(&config), None);

    let reader = File::open(&csv)?;
    let imported = service.import_accruals(reader)?;
    let total: Decimal = imported.iter().map(|accrual| accrual.amount).sum();

    println!(
        "Imported {} accruals ({} total) from {} into {}",
        imported.len(),
        total,
        csv.display(),
        path.display()
    );
    for accrual in &imported {
        println!(
            "  - #{} {} {} [{}]",
            accrual.id,
            accrual.contract_number.as_deref().unwrap_or("?"),
            accrual.amount,
            accrual.status_label
        );
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let now = today
        .and_hms_opt(9, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now);

    let config = AppConfig::load()?;
    let service = build_service(
        MemoryRepository::default(),
        accrual_policy(&config),
        Some(now),
    );
    seed_demo(&service, today, now)?;

    println!("Dataverse demo as of {today} (in-memory sample data)");
    render(&service, true)
}

fn render<R>(service: &DataverseService<R>, list: bool) -> Result<(), AppError>
where
    R: DatasetRepository + 'static,
{
    let summary = service.summary(None)?;
    render_summary(&summary);

    if !list {
        return Ok(());
    }

    println!("\nContracts:");
    for contract in service.contracts(&ContractFilter::default(), None)? {
        let completion = contract
            .completion
            .map(|reason| format!(" ({})", reason.label()))
            .unwrap_or_default();
        println!(
            "  - {} [{}{}] {} | {} accruals, {} unpaid",
            contract.contract_number,
            contract.status_label,
            completion,
            contract.currency.code(),
            contract.payments.total_accruals,
            contract.payments.unpaid_accruals
        );
        if let Some(earned) = contract.earned_amount {
            println!("      earned {earned} {}", contract.currency.code());
        }
        if let Some(next) = contract.replaced_by {
            println!("      replaced by contract #{next}");
        }
    }

    println!("\nAccruals:");
    for accrual in service.accruals(&AccrualFilter::default(), None)? {
        println!(
            "  - #{} {} {} {} [{}]",
            accrual.id,
            accrual.contract_number.as_deref().unwrap_or("?"),
            accrual.amount,
            accrual.currency.map(Currency::code).unwrap_or(""),
            accrual.status_label
        );
    }

    println!("\nEducation threads:");
    for thread in service.threads(&ThreadFilter::default(), None)? {
        let window = match (thread.start_date, thread.end_date) {
            (Some(start), Some(end)) => format!("{start} .. {end}"),
            (Some(start), None) => format!("{start} .. open"),
            (None, Some(end)) => format!("open .. {end}"),
            (None, None) => "open".to_string(),
        };
        println!(
            "  - {} [{}] {} | {} contracts",
            thread.article,
            thread.status_label,
            window,
            thread.contracts.len()
        );
    }

    Ok(())
}

fn render_summary(summary: &DataverseSummary) {
    println!("As of {}", summary.as_of.to_rfc3339());

    println!("- Contracts: {}", status_line(&summary.contracts));
    println!("- Accruals: {}", status_line(&summary.accruals));
    println!("- Threads: {}", status_line(&summary.threads));

    if summary.outstanding.is_empty() {
        println!("- Nothing outstanding");
    }
    for total in &summary.outstanding {
        println!(
            "- Outstanding {}: {} (overdue {})",
            total.currency.code(),
            total.outstanding,
            total.overdue
        );
    }
}

fn status_line(family: &[StatusCount]) -> String {
    family
        .iter()
        .map(|entry| format!("{} {}", entry.count, entry.status))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn seed_demo<R>(
    service: &DataverseService<R>,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<(), ServiceError>
where
    R: DatasetRepository + 'static,
{
    let days = Duration::days;

    let scheme = service
        .create_payment_scheme(NewPaymentScheme {
            name: "Hourly".to_string(),
            description: "Presenter hours times the agreed rate".to_string(),
            parameters: serde_json::json!({ "rounding": 2 }),
            is_active: true,
        })?
        .id;

    let presenter = service
        .register_contractor(NewContractor {
            name: "Irina Volkova".to_string(),
            kind: ContractorKind::SelfEmployed,
            inn: Some("500100732259".to_string()),
            kpp: None,
            passport_data: None,
            bank_details: None,
            elba_id: None,
        })?
        .id;
    let author = service
        .register_contractor(NewContractor {
            name: "Northwind Courses LLC".to_string(),
            kind: ContractorKind::LegalEntity,
            inn: Some("7707083893".to_string()),
            kpp: Some("773601001".to_string()),
            passport_data: None,
            bank_details: None,
            elba_id: None,
        })?
        .id;
    let content = service
        .create_content(NewAuthorContent {
            title: "Rust in Production".to_string(),
            description: "Eight week backend course".to_string(),
            format: ContentFormat::Video,
        })?
        .id;

    let presenter_terms = |hours: i64| {
        ContractTerms::PresenterHourly(PresenterHourlyTerms {
            presenter,
            role: PresenterRole::Lead,
            payment_schedule: PaymentSchedule::Monthly,
            payment_day_of_week: None,
            hours_worked: Decimal::new(hours, 1),
            hourly_rate: Some(Decimal::from(2500)),
            tax_compensation: false,
        })
    };

    let expired = create(
        service,
        scheme,
        "P-2024-01",
        (today - days(400), Some(today - days(31))),
        Some(presenter_terms(480)),
    )?;
    let active = create(
        service,
        scheme,
        "P-2025-01",
        (today - days(30), Some(today + days(60))),
        Some(presenter_terms(125)),
    )?;
    service.supersede(expired, active)?;

    let paused = create(
        service,
        scheme,
        "P-2025-02",
        (today - days(10), None),
        Some(presenter_terms(40)),
    )?;

    create(
        service,
        scheme,
        "A-2025-01",
        (today + days(10), Some(today + days(375))),
        Some(author_terms(author, content)),
    )?;

    service.create_contract(NewContract {
        contract_number: "TPL-PRESENTER".to_string(),
        currency: Currency::Rub,
        payment_scheme: scheme,
        comment: "Standard presenter agreement".to_string(),
        is_template: true,
        allow_new_accruals: true,
        non_financial_terms: None,
        signed_at: None,
        valid_from: None,
        valid_until: None,
        terms: None,
    })?;

    let overdue = service.record_accrual(accrual(active, 1_500_000, "March sessions"))?;
    service.confirm_accrual(overdue.id, Some(now - days(45)))?;

    let settled = service.record_accrual(accrual(active, 1_625_000, "April sessions"))?;
    service.confirm_accrual(settled.id, Some(now - days(20)))?;
    service.pay_accrual(settled.id, Some(now - days(5)))?;

    let fresh = service.record_accrual(accrual(paused, 1_000_000, "Workshop prep"))?;
    service.confirm_accrual(fresh.id, Some(now - days(2)))?;
    service.record_accrual(accrual(active, 312_500, "Q&A hours"))?;
    service.set_accruals_allowed(paused, false)?;

    let bootcamp = service
        .create_thread(thread("RIP-BOOTCAMP-01", content, Some(today - days(7)), Some(today + days(49))))?
        .id;
    service.create_thread(thread("RIP-WORKSHOP-02", content, Some(today + days(14)), Some(today + days(16))))?;
    service.create_thread(thread("RIP-BOOTCAMP-00", content, Some(today - days(120)), Some(today - days(64))))?;
    service.create_thread(NewEducationThread {
        is_open_end: true,
        ..thread("RIP-SELFPACED", content, Some(today - days(90)), None)
    })?;
    service.assign_contract(bootcamp, active)?;

    Ok(())
}

fn create<R>(
    service: &DataverseService<R>,
    scheme: PaymentSchemeId,
    number: &str,
    (valid_from, valid_until): (NaiveDate, Option<NaiveDate>),
    terms: Option<ContractTerms>,
) -> Result<ContractId, ServiceError>
where
    R: DatasetRepository + 'static,
{
    let view = service.create_contract(NewContract {
        contract_number: number.to_string(),
        currency: Currency::Rub,
        payment_scheme: scheme,
        comment: String::new(),
        is_template: false,
        allow_new_accruals: true,
        non_financial_terms: None,
        signed_at: Some(valid_from - Duration::days(5)),
        valid_from: Some(valid_from),
        valid_until,
        terms,
    })?;
    Ok(view.id)
}

fn author_terms(author: dataverse::ids::ContractorId, content: ContentId) -> ContractTerms {
    ContractTerms::Author(AuthorTerms {
        author,
        content,
        commission_type: Some(CommissionType::PercentageRevenue),
        commission_value: Some(Decimal::new(150, 1)),
    })
}

fn accrual(contract: ContractId, cents: i64, comment: &str) -> NewAccrual {
    NewAccrual {
        contract,
        amount: Decimal::new(cents, 2),
        formula_parameters: None,
        is_automated: false,
        comment: Some(comment.to_string()),
    }
}

fn thread(
    article: &str,
    author_content: ContentId,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> NewEducationThread {
    NewEducationThread {
        article: article.to_string(),
        author_content,
        start_date,
        end_date,
        is_open_start: false,
        is_open_end: false,
        is_auto_generated: false,
        schedule: serde_json::Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dataverse::contracts::AccrualPolicy;
    use dataverse::service::FixedClock;
    use std::sync::Arc;

    #[test]
    fn demo_dataset_covers_every_headline_status() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let service = DataverseService::with_clock(
            Arc::new(MemoryRepository::default()),
            AccrualPolicy::default(),
            Arc::new(FixedClock(now)),
        );
        seed_demo(&service, now.date_naive(), now).expect("demo data seeds");

        let summary = service.summary(None).expect("summary");
        assert_eq!(summary.count(&summary.contracts, "draft"), 1);
        assert_eq!(summary.count(&summary.contracts, "scheduled"), 1);
        assert_eq!(summary.count(&summary.contracts, "active"), 1);
        assert_eq!(summary.count(&summary.contracts, "suspended"), 1);
        assert_eq!(summary.count(&summary.contracts, "completed"), 1);

        assert_eq!(summary.count(&summary.accruals, "pending"), 1);
        assert_eq!(summary.count(&summary.accruals, "confirmed"), 1);
        assert_eq!(summary.count(&summary.accruals, "overdue"), 1);
        assert_eq!(summary.count(&summary.accruals, "paid"), 1);

        assert_eq!(summary.count(&summary.threads, "active"), 1);
        assert_eq!(summary.count(&summary.threads, "upcoming"), 1);
        assert_eq!(summary.count(&summary.threads, "expired"), 1);
        assert_eq!(summary.count(&summary.threads, "open_end"), 1);
    }
}
