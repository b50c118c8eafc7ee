use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crate::contracts::{
    AccrualPolicy, ContentFormat, NewAccrual, NewAuthorContent, NewPaymentScheme,
};
use crate::ids::{ContentId, ContractId, ContractorId, PaymentSchemeId};
use crate::service::{DataverseService, FixedClock};
use crate::store::fixtures::{new_contract, new_contractor, now, presenter_terms};
use crate::store::MemoryRepository;

pub(super) use crate::store::fixtures::{author_terms, date};

pub(super) struct Seeded {
    pub(super) service: DataverseService<MemoryRepository>,
    pub(super) scheme: PaymentSchemeId,
    pub(super) presenter: ContractorId,
    pub(super) content: ContentId,
}

pub(super) fn service_at(at: DateTime<Utc>) -> DataverseService<MemoryRepository> {
    DataverseService::with_clock(
        Arc::new(MemoryRepository::default()),
        AccrualPolicy::default(),
        Arc::new(FixedClock(at)),
    )
}

pub(super) fn seeded() -> Seeded {
    let service = service_at(now());
    let scheme = service
        .create_payment_scheme(NewPaymentScheme {
            name: "Hourly".to_string(),
            description: String::new(),
            parameters: json!({"rate": 3000}),
            is_active: true,
        })
        .expect("scheme");
    let presenter = service
        .register_contractor(new_contractor("Ivan Sokolov", Some("7707083893")))
        .expect("contractor");
    let content = service
        .create_content(NewAuthorContent {
            title: "Data Analysis Bootcamp".to_string(),
            description: String::new(),
            format: ContentFormat::Video,
        })
        .expect("content");

    Seeded {
        service,
        scheme: scheme.id,
        presenter: presenter.id,
        content: content.id,
    }
}

impl Seeded {
    /// An active presenter contract numbered `number`.
    pub(super) fn presenter_contract(&self, number: &str) -> ContractId {
        let mut new = new_contract(number, self.scheme);
        new.terms = Some(presenter_terms(self.presenter));
        self.service.create_contract(new).expect("contract").id
    }

    pub(super) fn draft_contract(&self, number: &str) -> ContractId {
        let mut new = new_contract(number, self.scheme);
        new.signed_at = None;
        self.service.create_contract(new).expect("contract").id
    }
}

pub(super) fn accrual(contract: ContractId, cents: i64) -> NewAccrual {
    NewAccrual {
        contract,
        amount: Decimal::new(cents, 2),
        formula_parameters: None,
        is_automated: false,
        comment: None,
    }
}
