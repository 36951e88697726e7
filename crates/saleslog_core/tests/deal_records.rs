mod common;

use chrono::Duration;
use common::{at, count, seed_contoso, seed_customer, seed_user};
use rust_decimal_macros::dec;
use saleslog_core::db::open_db_in_memory;
use saleslog_core::model::deal::{DealPatch, NewDeal, DEAL_STATUS_ACTIVE, DEFAULT_CURRENCY};
use saleslog_core::repo::deal_repo::{DealListQuery, DealSort, SqliteDealRepository};
use saleslog_core::repo::query::Sort;
use saleslog_core::{
    ConstraintKind, MutableRecordRepository, RecordRepository, RepoError, ValidationError,
};

#[test]
fn insert_applies_defaults_and_keeps_decimal_precision() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Contoso");
    let repo = SqliteDealRepository::try_new(&conn).unwrap();

    let deal = repo
        .insert(&NewDeal {
            value: Some(dec!(1234567890123456.78)),
            close_date: Some(at(2024, 6, 30)),
            ..NewDeal::new(customer.id, "Azure Migration")
        })
        .unwrap();

    assert_eq!(deal.currency, DEFAULT_CURRENCY);
    assert_eq!(deal.status, DEAL_STATUS_ACTIVE);
    assert_eq!(deal.value, Some(dec!(1234567890123456.78)));
    assert_eq!(deal.close_date, Some(at(2024, 6, 30)));
    assert_eq!(repo.get(deal.id).unwrap().unwrap(), deal);
}

#[test]
fn value_outside_decimal_18_2_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Contoso");
    let repo = SqliteDealRepository::try_new(&conn).unwrap();

    let too_precise = repo
        .insert(&NewDeal {
            value: Some(dec!(10.125)),
            ..NewDeal::new(customer.id, "Fractions")
        })
        .unwrap_err();
    assert!(matches!(
        too_precise,
        RepoError::Validation(ValidationError::DecimalOutOfRange { field: "value", .. })
    ));

    let too_large = repo
        .insert(&NewDeal {
            value: Some(dec!(12345678901234567.00)),
            ..NewDeal::new(customer.id, "Whale")
        })
        .unwrap_err();
    assert!(matches!(
        too_large,
        RepoError::Validation(ValidationError::DecimalOutOfRange { .. })
    ));
    assert_eq!(count(&conn, "deals"), 0);
}

#[test]
fn close_date_with_sub_millisecond_precision_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Contoso");
    let repo = SqliteDealRepository::try_new(&conn).unwrap();

    let err = repo
        .insert(&NewDeal {
            close_date: Some(at(2024, 6, 30) + Duration::microseconds(1)),
            ..NewDeal::new(customer.id, "Azure Migration")
        })
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::SubMillisecond { field: "closeDate", .. })
    ));
    assert_eq!(count(&conn, "deals"), 0);
}

#[test]
fn insert_for_missing_customer_is_a_foreign_key_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDealRepository::try_new(&conn).unwrap();

    let err = repo.insert(&NewDeal::new(9, "Nowhere")).unwrap_err();

    assert_eq!(err.constraint_kind(), Some(ConstraintKind::ForeignKey));
}

#[test]
fn update_changes_status_and_clears_value() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Contoso");
    let repo = SqliteDealRepository::try_new(&conn).unwrap();
    let deal = repo
        .insert(&NewDeal {
            value: Some(dec!(50000.00)),
            stage: Some("Proposal".to_string()),
            ..NewDeal::new(customer.id, "Azure Migration")
        })
        .unwrap();

    let updated = repo
        .update(
            deal.id,
            &DealPatch {
                status: Some("Won".to_string()),
                value: Some(None),
                ..DealPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.status, "Won");
    assert_eq!(updated.value, None);
    assert_eq!(updated.stage.as_deref(), Some("Proposal"));
    assert!(!updated.is_active());
}

#[test]
fn delete_is_refused_while_interactions_reference_the_deal() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let repo = SqliteDealRepository::try_new(&conn).unwrap();

    let err = repo.delete(contoso.deal.id).unwrap_err();

    assert_eq!(err.constraint_kind(), Some(ConstraintKind::Dependents));
    assert!(repo.get(contoso.deal.id).unwrap().is_some());
}

#[test]
fn delete_without_interactions_removes_the_deal() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Contoso");
    let repo = SqliteDealRepository::try_new(&conn).unwrap();
    let deal = repo.insert(&NewDeal::new(customer.id, "Short Lived")).unwrap();

    repo.delete(deal.id).unwrap();

    assert!(repo.get(deal.id).unwrap().is_none());
    assert_eq!(count(&conn, "customers"), 1);
}

#[test]
fn creator_reference_is_nulled_when_user_is_deleted() {
    let conn = open_db_in_memory().unwrap();
    let user = seed_user(&conn, "owner@example.com", "Owner");
    let customer = seed_customer(&conn, "Contoso");
    let repo = SqliteDealRepository::try_new(&conn).unwrap();
    let deal = repo
        .insert(&NewDeal {
            created_by_user_id: Some(user.id),
            ..NewDeal::new(customer.id, "Azure Migration")
        })
        .unwrap();

    conn.execute("DELETE FROM users WHERE id = ?1;", [user.id])
        .unwrap();

    assert_eq!(repo.get(deal.id).unwrap().unwrap().created_by_user_id, None);
}

#[test]
fn query_filters_by_customer_status_and_search() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_customer(&conn, "Contoso");
    let fabrikam = seed_customer(&conn, "Fabrikam");
    let repo = SqliteDealRepository::try_new(&conn).unwrap();
    repo.insert(&NewDeal::new(contoso.id, "Azure Migration")).unwrap();
    repo.insert(&NewDeal {
        status: "Lost".to_string(),
        ..NewDeal::new(contoso.id, "Office Rollout")
    })
    .unwrap();
    repo.insert(&NewDeal {
        description: Some("Migration of the data center".to_string()),
        ..NewDeal::new(fabrikam.id, "Datacenter")
    })
    .unwrap();

    let active_contoso = repo
        .query(&DealListQuery {
            customer_id: Some(contoso.id),
            status: Some(DEAL_STATUS_ACTIVE.to_string()),
            ..DealListQuery::default()
        })
        .unwrap();
    assert_eq!(active_contoso.len(), 1);
    assert_eq!(active_contoso[0].title, "Azure Migration");

    let migrations = repo
        .query(&DealListQuery {
            search: Some("migration".to_string()),
            sort: Some(Sort::asc(DealSort::Title)),
            ..DealListQuery::default()
        })
        .unwrap();
    let titles: Vec<_> = migrations.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Azure Migration", "Datacenter"]);
}
