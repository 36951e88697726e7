#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use saleslog_core::model::customer::{Customer, NewCustomer};
use saleslog_core::model::deal::{Deal, NewDeal};
use saleslog_core::model::interaction::{InteractionLog, NewInteractionLog};
use saleslog_core::model::tag::{NewTag, Tag};
use saleslog_core::model::user::{NewUser, User};
use saleslog_core::repo::customer_repo::SqliteCustomerRepository;
use saleslog_core::repo::deal_repo::SqliteDealRepository;
use saleslog_core::repo::interaction_repo::SqliteInteractionRepository;
use saleslog_core::repo::tag_repo::SqliteTagRepository;
use saleslog_core::repo::user_repo::SqliteUserRepository;
use saleslog_core::RecordRepository;

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 30, 0).unwrap()
}

pub fn seed_user(conn: &Connection, email: &str, name: &str) -> User {
    SqliteUserRepository::try_new(conn)
        .unwrap()
        .insert(&NewUser::new(email, name))
        .unwrap()
}

pub fn seed_customer(conn: &Connection, name: &str) -> Customer {
    SqliteCustomerRepository::try_new(conn)
        .unwrap()
        .insert(&NewCustomer::new(name))
        .unwrap()
}

pub fn seed_deal(conn: &Connection, customer_id: i64, title: &str) -> Deal {
    SqliteDealRepository::try_new(conn)
        .unwrap()
        .insert(&NewDeal::new(customer_id, title))
        .unwrap()
}

pub fn new_interaction(
    customer_id: i64,
    deal_id: i64,
    user_id: i64,
    subject: &str,
    date: DateTime<Utc>,
) -> NewInteractionLog {
    NewInteractionLog {
        customer_id,
        deal_id,
        user_id,
        kind: "Meeting".to_string(),
        subject: subject.to_string(),
        notes: format!("notes for {subject}"),
        interaction_date: date,
    }
}

pub fn seed_interaction(
    conn: &Connection,
    customer_id: i64,
    deal_id: i64,
    user_id: i64,
    subject: &str,
    date: DateTime<Utc>,
) -> InteractionLog {
    SqliteInteractionRepository::try_new(conn)
        .unwrap()
        .insert(&new_interaction(customer_id, deal_id, user_id, subject, date))
        .unwrap()
}

pub fn seed_tag(conn: &Connection, name: &str) -> Tag {
    SqliteTagRepository::try_new(conn)
        .unwrap()
        .insert(&NewTag::new(name))
        .unwrap()
}

/// The Contoso scenario: one user, one customer, one deal, one interaction.
pub struct Contoso {
    pub user: User,
    pub customer: Customer,
    pub deal: Deal,
    pub interaction: InteractionLog,
}

pub fn seed_contoso(conn: &Connection) -> Contoso {
    let user = seed_user(conn, "alice@contoso.example", "Alice");
    let customer = seed_customer(conn, "Contoso");
    let deal = seed_deal(conn, customer.id, "Azure Migration");
    let interaction = seed_interaction(
        conn,
        customer.id,
        deal.id,
        user.id,
        "Kickoff",
        at(2024, 3, 1),
    );
    Contoso {
        user,
        customer,
        deal,
        interaction,
    }
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
