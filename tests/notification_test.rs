use agrirent::db;
use agrirent::mailer::{HttpMailer, Mailer};
use agrirent::models::{item, rental, stock_notification, user};
use agrirent::services::{notification_service, rental_service};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_user(db: &DatabaseConnection, username: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let account = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        role: Set("user".to_string()),
        status: Set("approved".to_string()),
        is_verified: Set(true),
        wallet_balance: Set("0.00".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    user::Entity::insert(account)
        .exec(db)
        .await
        .expect("Failed to create user")
        .last_insert_id
}

async fn create_test_item(db: &DatabaseConnection, name: &str, available: bool) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let equipment = item::ActiveModel {
        name: Set(name.to_string()),
        category: Set("Sprayers".to_string()),
        description: Set("Test equipment".to_string()),
        price_per_day: Set("40.00".to_string()),
        is_available: Set(available),
        added_by: Set(1),
        is_new: Set(false),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    item::Entity::insert(equipment)
        .exec(db)
        .await
        .expect("Failed to create item")
        .last_insert_id
}

async fn fetch_subscription(db: &DatabaseConnection, id: i32) -> stock_notification::Model {
    stock_notification::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_subscribe_is_idempotent() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "alice").await;
    let item_id = create_test_item(&db, "Sprayer", false).await;

    let first = notification_service::subscribe(&db, user_id, item_id)
        .await
        .expect("Subscribe failed");
    assert!(first.created);

    let second = notification_service::subscribe(&db, user_id, item_id)
        .await
        .expect("Second subscribe failed");
    assert!(!second.created);
    assert_eq!(second.subscription.id, first.subscription.id);
}

#[tokio::test]
async fn test_unsubscribe_is_owner_scoped() {
    let db = setup_test_db().await;
    let alice = create_test_user(&db, "alice").await;
    let mallory = create_test_user(&db, "mallory").await;
    let item_id = create_test_item(&db, "Sprayer", false).await;

    let sub = notification_service::subscribe(&db, alice, item_id)
        .await
        .unwrap()
        .subscription;

    // Someone else's subscription looks like it doesn't exist
    let err = notification_service::unsubscribe(&db, mallory, sub.id)
        .await
        .expect_err("Foreign unsubscribe should fail");
    assert!(matches!(err, agrirent::domain::DomainError::NotFound));

    notification_service::unsubscribe(&db, alice, sub.id)
        .await
        .expect("Own unsubscribe failed");
}

#[tokio::test]
async fn test_restock_fanout_marks_only_successful_sends() {
    let db = setup_test_db().await;
    let alice = create_test_user(&db, "alice").await;
    let bob = create_test_user(&db, "bob").await;
    let item_id = create_test_item(&db, "Sprayer", false).await;

    let alice_sub = notification_service::subscribe(&db, alice, item_id)
        .await
        .unwrap()
        .subscription;
    let bob_sub = notification_service::subscribe(&db, bob, item_id)
        .await
        .unwrap()
        .subscription;

    let mock_server = MockServer::start().await;

    // Bob's mailbox bounces; everyone else gets through
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_partial_json(
            serde_json::json!({ "to": "bob@example.com" }),
        ))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mailer = HttpMailer::new(
        format!("{}/send", mock_server.uri()),
        "noreply@agrirent.local".to_string(),
    );

    let restocked = item::Entity::find_by_id(item_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let sent = notification_service::notify_restocked(&db, &mailer, &restocked)
        .await
        .expect("Fan-out failed");

    assert_eq!(sent, 1);
    assert!(fetch_subscription(&db, alice_sub.id).await.notified);
    // Bob stays unsent so a later restock can retry him
    assert!(!fetch_subscription(&db, bob_sub.id).await.notified);
}

#[tokio::test]
async fn test_deadline_reminder_sent_once() {
    let db = setup_test_db().await;
    let alice = create_test_user(&db, "alice").await;
    let item_id = create_test_item(&db, "Sprayer", true).await;

    let created = rental_service::create_rental(&db, alice, item_id)
        .await
        .unwrap();
    rental_service::confirm_payment(&db, alice, created.id, None)
        .await
        .unwrap();
    rental_service::set_status(&db, created.id, "approved")
        .await
        .unwrap();

    // Backdate the approval so the deadline is 2 days out
    let approved_at = (chrono::Utc::now() - chrono::Duration::days(5)).to_rfc3339();
    let mut active: rental::ActiveModel = rental::Entity::find_by_id(created.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap()
        .into();
    active.approved_at = Set(Some(approved_at));
    active.update(&db).await.unwrap();

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mailer = HttpMailer::new(
        format!("{}/send", mock_server.uri()),
        "noreply@agrirent.local".to_string(),
    );

    let sent = notification_service::send_deadline_reminders(&db, &mailer)
        .await
        .expect("Reminder run failed");
    assert_eq!(sent, 1);

    // The sent flag stops a second run from mailing again
    let again = notification_service::send_deadline_reminders(&db, &mailer)
        .await
        .expect("Second run failed");
    assert_eq!(again, 0);
}

#[tokio::test]
async fn test_relay_failure_reports_external_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let mailer = HttpMailer::new(
        format!("{}/send", mock_server.uri()),
        "noreply@agrirent.local".to_string(),
    );

    let err = mailer
        .send("alice@example.com", "Hello", "Body")
        .await
        .expect_err("Relay failure should surface");
    assert!(matches!(err, agrirent::domain::DomainError::External(_)));
}
