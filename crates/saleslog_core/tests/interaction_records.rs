mod common;

use chrono::Duration;
use common::{
    at, count, new_interaction, seed_contoso, seed_customer, seed_deal, seed_interaction,
    seed_tag, seed_user,
};
use saleslog_core::db::open_db_in_memory;
use saleslog_core::model::attachment::{AttachmentPatch, NewAttachment};
use saleslog_core::model::interaction::InteractionLogPatch;
use saleslog_core::model::EntityKind;
use saleslog_core::repo::attachment_repo::{AttachmentListQuery, SqliteAttachmentRepository};
use saleslog_core::repo::interaction_repo::{InteractionListQuery, SqliteInteractionRepository};
use saleslog_core::repo::interaction_tag_repo::SqliteInteractionTagRepository;
use saleslog_core::{
    ConstraintKind, MutableRecordRepository, RecordRepository, RepoError, ValidationError,
};

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let repo = SqliteInteractionRepository::try_new(&conn).unwrap();

    let loaded = repo.get(contoso.interaction.id).unwrap().unwrap();

    assert_eq!(loaded, contoso.interaction);
    assert_eq!(loaded.kind, "Meeting");
    assert_eq!(loaded.subject, "Kickoff");
    assert_eq!(loaded.interaction_date, at(2024, 3, 1));
}

#[test]
fn deal_of_another_customer_is_a_foreign_key_violation() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let fabrikam = seed_customer(&conn, "Fabrikam");
    let repo = SqliteInteractionRepository::try_new(&conn).unwrap();

    let err = repo
        .insert(&new_interaction(
            fabrikam.id,
            contoso.deal.id,
            contoso.user.id,
            "Wrong pairing",
            at(2024, 3, 2),
        ))
        .unwrap_err();

    assert_eq!(err.constraint_kind(), Some(ConstraintKind::ForeignKey));
    assert_eq!(count(&conn, "interaction_logs"), 1);
}

#[test]
fn missing_deal_or_user_is_a_foreign_key_violation() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let repo = SqliteInteractionRepository::try_new(&conn).unwrap();

    let missing_deal = repo
        .insert(&new_interaction(
            contoso.customer.id,
            999,
            contoso.user.id,
            "No deal",
            at(2024, 3, 2),
        ))
        .unwrap_err();
    assert_eq!(missing_deal.constraint_kind(), Some(ConstraintKind::ForeignKey));

    let missing_user = repo
        .insert(&new_interaction(
            contoso.customer.id,
            contoso.deal.id,
            999,
            "No user",
            at(2024, 3, 2),
        ))
        .unwrap_err();
    assert_eq!(missing_user.constraint_kind(), Some(ConstraintKind::ForeignKey));
}

#[test]
fn blank_notes_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let repo = SqliteInteractionRepository::try_new(&conn).unwrap();

    let mut new = new_interaction(
        contoso.customer.id,
        contoso.deal.id,
        contoso.user.id,
        "Follow-up",
        at(2024, 3, 5),
    );
    new.notes = "  ".to_string();

    let err = repo.insert(&new).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::Required { field: "notes" })
    ));
}

#[test]
fn interaction_date_must_fit_millisecond_storage() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let repo = SqliteInteractionRepository::try_new(&conn).unwrap();
    let with_millis = at(2025, 1, 15) + Duration::milliseconds(123);

    let stored = repo
        .insert(&new_interaction(
            contoso.customer.id,
            contoso.deal.id,
            contoso.user.id,
            "Precise",
            with_millis,
        ))
        .unwrap();
    assert_eq!(stored.interaction_date, with_millis);
    assert_eq!(repo.get(stored.id).unwrap().unwrap(), stored);

    let with_nanos = with_millis + Duration::nanoseconds(456_789);
    let err = repo
        .insert(&new_interaction(
            contoso.customer.id,
            contoso.deal.id,
            contoso.user.id,
            "Too precise",
            with_nanos,
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::SubMillisecond {
            field: "interactionDate",
            ..
        })
    ));

    let err = repo
        .update(
            stored.id,
            &InteractionLogPatch {
                interaction_date: Some(with_nanos),
                ..InteractionLogPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.get(stored.id).unwrap().unwrap().interaction_date, with_millis);
    assert_eq!(count(&conn, "interaction_logs"), 2);
}

#[test]
fn update_rewrites_content_but_keeps_references() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let repo = SqliteInteractionRepository::try_new(&conn).unwrap();

    let updated = repo
        .update(
            contoso.interaction.id,
            &InteractionLogPatch {
                kind: Some("Call".to_string()),
                interaction_date: Some(at(2024, 3, 4)),
                ..InteractionLogPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.kind, "Call");
    assert_eq!(updated.subject, "Kickoff");
    assert_eq!(updated.interaction_date, at(2024, 3, 4));
    assert_eq!(updated.deal_id, contoso.deal.id);
    assert_eq!(updated.customer_id, contoso.customer.id);
}

#[test]
fn delete_cascades_attachments_and_tag_links() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let tag = seed_tag(&conn, "hot");
    SqliteAttachmentRepository::try_new(&conn)
        .unwrap()
        .insert(&NewAttachment::new(
            contoso.interaction.id,
            "minutes.pdf",
            "blob://minutes.pdf",
        ))
        .unwrap();
    SqliteInteractionTagRepository::try_new(&conn)
        .unwrap()
        .attach_tag(contoso.interaction.id, tag.id)
        .unwrap();

    SqliteInteractionRepository::try_new(&conn)
        .unwrap()
        .delete(contoso.interaction.id)
        .unwrap();

    assert_eq!(count(&conn, "interaction_logs"), 0);
    assert_eq!(count(&conn, "attachments"), 0);
    assert_eq!(count(&conn, "interaction_log_tags"), 0);
    assert_eq!(count(&conn, "tags"), 1);
}

#[test]
fn query_orders_by_interaction_date_and_filters_range() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let (customer, deal, user) = (contoso.customer.id, contoso.deal.id, contoso.user.id);
    let later = seed_interaction(&conn, customer, deal, user, "Demo", at(2024, 3, 10));
    let middle = seed_interaction(&conn, customer, deal, user, "Pricing", at(2024, 3, 5));
    let repo = SqliteInteractionRepository::try_new(&conn).unwrap();

    let all = repo.query(&InteractionListQuery::default()).unwrap();
    let ids: Vec<_> = all.iter().map(|log| log.id).collect();
    assert_eq!(ids, vec![later.id, middle.id, contoso.interaction.id]);

    let window = repo
        .query(&InteractionListQuery {
            from: Some(at(2024, 3, 1)),
            to: Some(at(2024, 3, 10)),
            ..InteractionListQuery::default()
        })
        .unwrap();
    let ids: Vec<_> = window.iter().map(|log| log.id).collect();
    assert_eq!(ids, vec![middle.id, contoso.interaction.id]);
}

#[test]
fn query_by_customer_returns_only_that_customers_rows_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let fabrikam = seed_customer(&conn, "Fabrikam");
    let fabrikam_deal = seed_deal(&conn, fabrikam.id, "Data Lake");
    let user = contoso.user.id;
    let contoso_late = seed_interaction(
        &conn,
        contoso.customer.id,
        contoso.deal.id,
        user,
        "Contract review",
        at(2024, 3, 20),
    );
    seed_interaction(&conn, fabrikam.id, fabrikam_deal.id, user, "Intro", at(2024, 3, 25));
    let contoso_middle = seed_interaction(
        &conn,
        contoso.customer.id,
        contoso.deal.id,
        user,
        "Pricing",
        at(2024, 3, 8),
    );
    seed_interaction(&conn, fabrikam.id, fabrikam_deal.id, user, "Scoping", at(2024, 3, 2));
    let repo = SqliteInteractionRepository::try_new(&conn).unwrap();

    let rows = repo
        .query(&InteractionListQuery {
            customer_id: Some(contoso.customer.id),
            ..InteractionListQuery::default()
        })
        .unwrap();

    assert!(rows.iter().all(|log| log.customer_id == contoso.customer.id));
    let ids: Vec<_> = rows.iter().map(|log| log.id).collect();
    assert_eq!(
        ids,
        vec![contoso_late.id, contoso_middle.id, contoso.interaction.id]
    );
    assert!(rows
        .windows(2)
        .all(|pair| pair[0].interaction_date >= pair[1].interaction_date));

    let fabrikam_rows = repo
        .query(&InteractionListQuery {
            customer_id: Some(fabrikam.id),
            ..InteractionListQuery::default()
        })
        .unwrap();
    let subjects: Vec<_> = fabrikam_rows.iter().map(|log| log.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Intro", "Scoping"]);
}

#[test]
fn query_filters_by_deal_user_tag_and_text() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let second_deal = seed_deal(&conn, contoso.customer.id, "Office Rollout");
    let bob = seed_user(&conn, "bob@example.com", "Bob");
    let rollout = seed_interaction(
        &conn,
        contoso.customer.id,
        second_deal.id,
        bob.id,
        "Rollout planning",
        at(2024, 4, 1),
    );
    let tag = seed_tag(&conn, "renewal");
    SqliteInteractionTagRepository::try_new(&conn)
        .unwrap()
        .attach_tag(rollout.id, tag.id)
        .unwrap();
    let repo = SqliteInteractionRepository::try_new(&conn).unwrap();

    let by_deal = repo
        .query(&InteractionListQuery {
            deal_id: Some(contoso.deal.id),
            ..InteractionListQuery::default()
        })
        .unwrap();
    assert_eq!(by_deal, vec![contoso.interaction.clone()]);

    let by_user = repo
        .query(&InteractionListQuery {
            user_id: Some(bob.id),
            ..InteractionListQuery::default()
        })
        .unwrap();
    assert_eq!(by_user.len(), 1);
    assert_eq!(by_user[0].id, rollout.id);

    let by_tag = repo
        .query(&InteractionListQuery {
            tag_id: Some(tag.id),
            ..InteractionListQuery::default()
        })
        .unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].id, rollout.id);

    let by_text = repo
        .query(&InteractionListQuery {
            search: Some("KICK".to_string()),
            ..InteractionListQuery::default()
        })
        .unwrap();
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].id, contoso.interaction.id);
}

#[test]
fn attachment_rejects_negative_size_and_missing_log() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let repo = SqliteAttachmentRepository::try_new(&conn).unwrap();

    let negative = repo
        .insert(&NewAttachment {
            file_size: Some(-1),
            ..NewAttachment::new(contoso.interaction.id, "a.txt", "blob://a")
        })
        .unwrap_err();
    assert!(matches!(
        negative,
        RepoError::Validation(ValidationError::Negative {
            field: "fileSize",
            value: -1
        })
    ));

    let orphan = repo
        .insert(&NewAttachment::new(404, "b.txt", "blob://b"))
        .unwrap_err();
    assert_eq!(orphan.constraint_kind(), Some(ConstraintKind::ForeignKey));
}

#[test]
fn attachments_list_newest_upload_first_and_update_keeps_upload_time() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let repo = SqliteAttachmentRepository::try_new(&conn).unwrap();
    let first = repo
        .insert(&NewAttachment {
            file_size: Some(2048),
            content_type: Some("application/pdf".to_string()),
            uploaded_by_user_id: Some(contoso.user.id),
            ..NewAttachment::new(contoso.interaction.id, "deck.pdf", "blob://deck")
        })
        .unwrap();
    let second = repo
        .insert(&NewAttachment::new(
            contoso.interaction.id,
            "notes.txt",
            "blob://notes",
        ))
        .unwrap();

    let listed = repo
        .query(&AttachmentListQuery {
            interaction_log_id: Some(contoso.interaction.id),
            ..AttachmentListQuery::default()
        })
        .unwrap();
    let ids: Vec<_> = listed.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let renamed = repo
        .update(
            first.id,
            &AttachmentPatch {
                file_name: Some("deck-v2.pdf".to_string()),
                content_type: Some(None),
                ..AttachmentPatch::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.file_name, "deck-v2.pdf");
    assert_eq!(renamed.content_type, None);
    assert_eq!(renamed.file_size, Some(2048));
    assert_eq!(renamed.uploaded_at, first.uploaded_at);
}

#[test]
fn uploader_reference_is_nulled_when_user_is_deleted() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let uploader = seed_user(&conn, "uploader@example.com", "Uploader");
    let repo = SqliteAttachmentRepository::try_new(&conn).unwrap();
    let attachment = repo
        .insert(&NewAttachment {
            uploaded_by_user_id: Some(uploader.id),
            ..NewAttachment::new(contoso.interaction.id, "x.png", "blob://x")
        })
        .unwrap();

    saleslog_core::repo::user_repo::SqliteUserRepository::try_new(&conn)
        .unwrap()
        .delete(uploader.id)
        .unwrap();

    let attachment = repo.get(attachment.id).unwrap().unwrap();
    assert_eq!(attachment.uploaded_by_user_id, None);
}

#[test]
fn attach_tag_is_idempotent_and_detach_reports_change() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let tag = seed_tag(&conn, "hot");
    let links = SqliteInteractionTagRepository::try_new(&conn).unwrap();

    assert!(links.attach_tag(contoso.interaction.id, tag.id).unwrap());
    assert!(!links.attach_tag(contoso.interaction.id, tag.id).unwrap());
    assert_eq!(count(&conn, "interaction_log_tags"), 1);

    assert!(links.detach_tag(contoso.interaction.id, tag.id).unwrap());
    assert!(!links.detach_tag(contoso.interaction.id, tag.id).unwrap());
    assert!(links
        .tags_for_interaction(contoso.interaction.id)
        .unwrap()
        .is_empty());
}

#[test]
fn tag_links_to_missing_records_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let tag = seed_tag(&conn, "hot");
    let links = SqliteInteractionTagRepository::try_new(&conn).unwrap();

    let missing_log = links.attach_tag(500, tag.id).unwrap_err();
    assert!(matches!(
        missing_log,
        RepoError::NotFound {
            entity: EntityKind::InteractionLog,
            id: 500
        }
    ));

    let missing_tag = links
        .attach_tag(contoso.interaction.id, 600)
        .unwrap_err();
    assert!(matches!(
        missing_tag,
        RepoError::NotFound {
            entity: EntityKind::Tag,
            id: 600
        }
    ));
}

#[test]
fn set_interaction_tags_replaces_the_whole_set_atomically() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let hot = seed_tag(&conn, "hot");
    let enterprise = seed_tag(&conn, "enterprise");
    let renewal = seed_tag(&conn, "renewal");
    let links = SqliteInteractionTagRepository::try_new(&conn).unwrap();
    let log_id = contoso.interaction.id;

    links.set_interaction_tags(log_id, &[hot.id, renewal.id]).unwrap();
    links
        .set_interaction_tags(log_id, &[enterprise.id, hot.id, enterprise.id])
        .unwrap();

    let names: Vec<_> = links
        .tags_for_interaction(log_id)
        .unwrap()
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    assert_eq!(names, vec!["enterprise", "hot"]);

    let err = links
        .set_interaction_tags(log_id, &[renewal.id, 999])
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { id: 999, .. }));
    assert_eq!(links.tags_for_interaction(log_id).unwrap().len(), 2);
}

#[test]
fn interaction_ids_for_tag_lists_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let newer = seed_interaction(
        &conn,
        contoso.customer.id,
        contoso.deal.id,
        contoso.user.id,
        "Review",
        at(2024, 5, 1),
    );
    let tag = seed_tag(&conn, "hot");
    let links = SqliteInteractionTagRepository::try_new(&conn).unwrap();
    links.attach_tag(contoso.interaction.id, tag.id).unwrap();
    links.attach_tag(newer.id, tag.id).unwrap();

    assert_eq!(
        links.interaction_ids_for_tag(tag.id).unwrap(),
        vec![newer.id, contoso.interaction.id]
    );
}

#[test]
fn changing_tags_refreshes_interaction_update_time() {
    let conn = open_db_in_memory().unwrap();
    let contoso = seed_contoso(&conn);
    let tag = seed_tag(&conn, "hot");
    conn.execute(
        "UPDATE interaction_logs SET updated_at = 0 WHERE id = ?1;",
        [contoso.interaction.id],
    )
    .unwrap();

    SqliteInteractionTagRepository::try_new(&conn)
        .unwrap()
        .attach_tag(contoso.interaction.id, tag.id)
        .unwrap();

    let reloaded = SqliteInteractionRepository::try_new(&conn)
        .unwrap()
        .get(contoso.interaction.id)
        .unwrap()
        .unwrap();
    assert!(reloaded.updated_at.timestamp_millis() > 0);
}
