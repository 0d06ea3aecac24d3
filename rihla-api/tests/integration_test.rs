use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rihla_api::{app, auth::issue_session, ApiSettings, AppState, AuthConfig};
use rihla_core::service::ServiceRef;
use rihla_core::user::{Role, User};
use rihla_store::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: AppState,
    store: MemoryStore,
    customer: User,
    other_customer: User,
    hotel_owner: User,
    guide: User,
    admin: User,
    super_admin: User,
}

impl TestApp {
    async fn new() -> Self {
        let store = MemoryStore::new();
        let customer = store.insert_user("Amina", "amina@example.com", Role::Customer).await;
        let other_customer = store.insert_user("Omar", "omar@example.com", Role::Customer).await;
        let hotel_owner = store.insert_user("Dar Salam", "owner@example.com", Role::HotelOwner).await;
        let guide = store.insert_user("Youssef", "guide@example.com", Role::TourGuide).await;
        let admin = store.insert_user("Admin", "admin@example.com", Role::Admin).await;
        let super_admin = store.insert_user("Root", "root@example.com", Role::SuperAdmin).await;

        store.register_service(ServiceRef::Tour(7), "Medina walking tour", Some(guide.id)).await;
        store.register_service(ServiceRef::Hotel(12), "Dar Salam - Room 12", Some(hotel_owner.id)).await;
        store.register_service(ServiceRef::Car(3), "Compact sedan", None).await;

        let auth = AuthConfig { secret: "test-secret".into(), expiration: 3600 };
        let state = AppState::in_memory(store.clone(), auth, ApiSettings::default());

        Self {
            router: app(state.clone()),
            state,
            store,
            customer,
            other_customer,
            hotel_owner,
            guide,
            admin,
            super_admin,
        }
    }

    fn session(&self, user: &User) -> String {
        issue_session(&self.state, user).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<String>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    /// Request authenticated with the placeholder `Bearer <userId>` identity.
    async fn as_user(&self, user: &User, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(user.id.to_string()), body).await
    }

    /// Request authenticated with a signed customer session.
    async fn as_customer(&self, user: &User, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(self.session(user)), body).await
    }

    async fn book_tour(&self) -> i64 {
        let (status, body) = self
            .as_customer(
                &self.customer,
                Method::POST,
                "/api/bookings",
                Some(json!({
                    "serviceType": "TOUR",
                    "serviceId": 7,
                    "startDate": "2024-06-01",
                    "totalPrice": 150
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["booking"]["id"].as_i64().unwrap()
    }

    async fn set_status(&self, actor: &User, booking_id: i64, status: &str) -> (StatusCode, Value) {
        self.as_user(
            actor,
            Method::PUT,
            "/api/admin/bookings",
            Some(json!({ "bookingId": booking_id, "status": status })),
        )
        .await
    }

    async fn notifications_of(&self, user: &User) -> Vec<Value> {
        let (status, body) = self.as_user(user, Method::GET, "/api/notifications?limit=100", None).await;
        assert_eq!(status, StatusCode::OK);
        body["notifications"].as_array().cloned().unwrap_or_default()
    }
}

// ============================================================================
// Booking creation
// ============================================================================

#[tokio::test]
async fn test_tour_booking_defaults_end_date() {
    let app = TestApp::new().await;

    let (status, body) = app
        .as_customer(
            &app.customer,
            Method::POST,
            "/api/bookings",
            Some(json!({
                "serviceType": "TOUR",
                "serviceId": 7,
                "startDate": "2024-06-01",
                "totalPrice": 150
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let booking = &body["booking"];
    assert_eq!(booking["serviceType"], "TOUR");
    assert_eq!(booking["serviceId"], 7);
    assert_eq!(booking["startDate"], "2024-06-01");
    assert_eq!(booking["endDate"], "2024-06-01");
    assert_eq!(booking["status"], "PENDING");
    assert_eq!(booking["paymentStatus"], "PENDING");
    assert_eq!(booking["totalPrice"].as_f64(), Some(150.0));
    assert_eq!(booking["contactEmail"], "amina@example.com");
    assert_eq!(booking["contactName"], "Amina");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_hotel_and_car_require_end_date() {
    let app = TestApp::new().await;

    let (status, body) = app
        .as_customer(
            &app.customer,
            Method::POST,
            "/api/bookings",
            Some(json!({"serviceType": "HOTEL", "roomId": 12, "startDate": "2024-06-01", "totalAmount": 300})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "endDate is required for HOTEL bookings");

    let (status, body) = app
        .as_customer(
            &app.customer,
            Method::POST,
            "/api/bookings",
            Some(json!({"serviceType": "CAR", "serviceId": 3, "startDate": "2024-06-01", "totalPrice": 80})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "endDate is required for CAR bookings");
}

#[tokio::test]
async fn test_negative_price_rejected_and_nothing_persisted() {
    let app = TestApp::new().await;

    let (status, body) = app
        .as_customer(
            &app.customer,
            Method::POST,
            "/api/bookings",
            Some(json!({"serviceType": "TOUR", "serviceId": 7, "startDate": "2024-06-01", "totalPrice": -5})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "totalPrice must not be negative");

    let (status, body) = app.as_customer(&app.customer, Method::GET, "/api/bookings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 0);
    assert_eq!(body["bookings"], json!([]));
}

#[tokio::test]
async fn test_unknown_service_type_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .as_customer(
            &app.customer,
            Method::POST,
            "/api/bookings",
            Some(json!({"serviceType": "SPACESHIP", "serviceId": 1, "startDate": "2024-06-01", "totalPrice": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid serviceType: SPACESHIP");
}

#[tokio::test]
async fn test_booking_requires_session() {
    let app = TestApp::new().await;
    let body = json!({"serviceType": "TOUR", "serviceId": 7, "startDate": "2024-06-01", "totalPrice": 150});

    let (status, _) = app.send(Method::POST, "/api/bookings", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The bare user id is not a session token.
    let (status, envelope) = app.as_user(&app.customer, Method::POST, "/api/bookings", Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(envelope["error"].is_string());
}

#[tokio::test]
async fn test_session_exchange() {
    let app = TestApp::new().await;

    let (status, body) = app.as_user(&app.customer, Method::POST, "/api/auth/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "amina@example.com");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = app.send(Method::GET, "/api/bookings", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::POST, "/api/auth/session", Some("9999".into()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Customer booking operations
// ============================================================================

#[tokio::test]
async fn test_customer_sees_only_own_bookings() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;

    let (status, body) = app
        .as_customer(&app.customer, Method::GET, &format!("/api/bookings/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["serviceName"], "Medina walking tour");

    let (status, _) = app
        .as_customer(&app.other_customer, Method::GET, &format!("/api/bookings/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.as_customer(&app.customer, Method::GET, "/api/bookings/424242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_customer_cancel_and_edit() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;
    let uri = format!("/api/bookings/{}", id);

    let (status, _) = app
        .as_customer(&app.customer, Method::PATCH, &uri, Some(json!({"status": "CONFIRMED"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .as_customer(
            &app.customer,
            Method::PATCH,
            &uri,
            Some(json!({"status": "CANCELLED", "specialRequests": "Vegetarian lunch"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CANCELLED");
    assert_eq!(body["booking"]["specialRequests"], "Vegetarian lunch");

    // The guide hears about it too.
    let provider = app.notifications_of(&app.guide).await;
    assert_eq!(provider.len(), 1);

    let (status, _) = app
        .as_customer(&app.customer, Method::PATCH, &uri, Some(json!({"status": "CANCELLED"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_customer_listing_paginates() {
    let app = TestApp::new().await;
    for _ in 0..3 {
        app.book_tour().await;
    }

    let (status, body) = app
        .as_customer(&app.customer, Method::GET, "/api/bookings?page=1&limit=2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookings"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["pagination"],
        json!({"page": 1, "limit": 2, "total": 3, "pages": 2, "hasNextPage": true, "hasPrevPage": false})
    );

    let (_, body) = app
        .as_customer(&app.customer, Method::GET, "/api/bookings?page=2&limit=2", None)
        .await;
    assert_eq!(body["bookings"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["hasPrevPage"], true);

    let (status, _) = app
        .as_customer(&app.customer, Method::GET, "/api/bookings?status=LOST", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Status transitions and notifications
// ============================================================================

#[tokio::test]
async fn test_provider_confirm_notifies_both_sides() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;

    let (status, body) = app
        .as_user(
            &app.guide,
            Method::PUT,
            &format!("/api/provider/bookings/{}", id),
            Some(json!({"status": "CONFIRMED", "notes": "Meet at Bab Boujloud"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CONFIRMED");

    let customer = app.notifications_of(&app.customer).await;
    assert_eq!(customer.len(), 1);
    assert_eq!(customer[0]["priority"], "HIGH");
    assert_eq!(customer[0]["category"], "BOOKING");
    assert_eq!(customer[0]["relatedId"], id);
    assert_eq!(customer[0]["relatedType"], "BOOKING");
    assert!(customer[0]["message"].as_str().unwrap().contains("Meet at Bab Boujloud"));

    let provider = app.notifications_of(&app.guide).await;
    assert_eq!(provider.len(), 1);
    assert_eq!(provider[0]["priority"], "HIGH");
}

#[tokio::test]
async fn test_provider_listing_and_ownership() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;

    let (status, body) = app.as_user(&app.guide, Method::GET, "/api/provider/bookings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = app.as_user(&app.hotel_owner, Method::GET, "/api/provider/bookings", None).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (status, _) = app
        .as_user(
            &app.hotel_owner,
            Method::PUT,
            &format!("/api/provider/bookings/{}", id),
            Some(json!({"status": "CONFIRMED"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_illegal_transition_is_conflict() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;

    let (status, body) = app.set_status(&app.admin, id, "COMPLETED").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Invalid status transition from PENDING to COMPLETED");

    let (status, _) = app.set_status(&app.admin, id, "PENDING").await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert!(app.notifications_of(&app.customer).await.is_empty());
}

#[tokio::test]
async fn test_admin_cancels_confirmed_booking() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;

    let (status, _) = app.set_status(&app.admin, id, "CONFIRMED").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.set_status(&app.admin, id, "CANCELLED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CANCELLED");

    let customer = app.notifications_of(&app.customer).await;
    assert_eq!(customer.len(), 2);
    // Newest first.
    assert_eq!(customer[0]["title"], "Booking cancelled");
    assert_eq!(customer[0]["priority"], "NORMAL");
}

#[tokio::test]
async fn test_override_is_super_admin_only_and_audited() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;
    app.set_status(&app.admin, id, "CANCELLED").await;

    let revive = json!({"bookingId": id, "status": "CONFIRMED", "override": true, "reason": "Cancelled by mistake"});
    let (status, _) = app
        .as_user(&app.admin, Method::PUT, "/api/admin/bookings", Some(revive.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .as_user(
            &app.super_admin,
            Method::PUT,
            "/api/admin/bookings",
            Some(json!({"bookingId": id, "status": "CONFIRMED", "override": true})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .as_user(&app.super_admin, Method::PUT, "/api/admin/bookings", Some(revive))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CONFIRMED");

    let (status, body) = app
        .as_user(&app.admin, Method::GET, &format!("/api/admin/bookings/{}/history", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let changes = body["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1]["fromValue"], "CANCELLED");
    assert_eq!(changes[1]["toValue"], "CONFIRMED");
    assert_eq!(changes[1]["overridden"], true);
    assert_eq!(changes[1]["reason"], "Cancelled by mistake");
}

#[tokio::test]
async fn test_payment_status_is_admin_only() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;

    let (status, _) = app
        .as_user(
            &app.guide,
            Method::PUT,
            &format!("/api/provider/bookings/{}", id),
            Some(json!({"paymentStatus": "PAID"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .as_user(
            &app.admin,
            Method::PUT,
            "/api/admin/bookings",
            Some(json!({"bookingId": id, "paymentStatus": "PAID"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["paymentStatus"], "PAID");
    assert_eq!(body["booking"]["status"], "PENDING");
}

#[tokio::test]
async fn test_admin_form_resubmits_current_status_with_payment() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;

    let (status, body) = app
        .as_user(
            &app.admin,
            Method::PUT,
            "/api/admin/bookings",
            Some(json!({"bookingId": id, "status": "PENDING", "paymentStatus": "PAID", "notes": "Paid at desk"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["booking"]["status"], "PENDING");
    assert_eq!(body["booking"]["paymentStatus"], "PAID");
    assert_eq!(body["booking"]["notes"], "Paid at desk");

    // Only the payment change is logged, and nobody is notified.
    let (_, body) = app
        .as_user(&app.admin, Method::GET, &format!("/api/admin/bookings/{}/history", id), None)
        .await;
    let changes = body["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["field"], "PAYMENT_STATUS");
    assert!(app.notifications_of(&app.customer).await.is_empty());

    // A bare same-status request is still an invalid transition.
    let (status, _) = app.set_status(&app.admin, id, "PENDING").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_transition() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;
    app.store.set_notifications_down(true).await;

    let (status, body) = app.set_status(&app.admin, id, "CONFIRMED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CONFIRMED");

    app.store.set_notifications_down(false).await;
    assert!(app.notifications_of(&app.customer).await.is_empty());
}

// ============================================================================
// Notifications API
// ============================================================================

#[tokio::test]
async fn test_notifications_are_private() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;
    app.set_status(&app.admin, id, "CONFIRMED").await;
    app.set_status(&app.admin, id, "COMPLETED").await;

    let (_, body) = app.as_user(&app.customer, Method::GET, "/api/notifications/unread-count", None).await;
    assert_eq!(body["count"], 2);

    let theirs = app.notifications_of(&app.guide).await;
    let foreign_id = theirs[0]["id"].as_i64().unwrap();
    let (status, _) = app
        .as_user(&app.customer, Method::PATCH, &format!("/api/notifications/{}/read", foreign_id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .as_user(&app.customer, Method::DELETE, &format!("/api/notifications/{}", foreign_id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mine = app.notifications_of(&app.customer).await;
    let (status, body) = app
        .as_user(
            &app.customer,
            Method::PATCH,
            &format!("/api/notifications/{}/read", mine[0]["id"]),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["isRead"], true);

    let (_, body) = app
        .as_user(&app.customer, Method::GET, "/api/notifications?unreadOnly=true", None)
        .await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["unreadCount"], 1);

    let (_, body) = app.as_user(&app.customer, Method::PATCH, "/api/notifications/read-all", None).await;
    assert_eq!(body["updated"], 1);

    let (status, _) = app.send(Method::GET, "/api/notifications", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Reviews
// ============================================================================

#[tokio::test]
async fn test_review_once_per_completed_booking() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;
    let review = json!({"bookingId": id, "rating": 5, "title": "Wonderful", "comment": "Great guide"});

    let (status, body) = app
        .as_customer(&app.customer, Method::POST, "/api/reviews", Some(review.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only completed bookings can be rated");

    app.set_status(&app.admin, id, "CONFIRMED").await;
    app.set_status(&app.admin, id, "COMPLETED").await;

    let (status, _) = app
        .as_customer(&app.other_customer, Method::POST, "/api/reviews", Some(review.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .as_customer(&app.customer, Method::POST, "/api/reviews", Some(json!({"bookingId": id, "rating": 6})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = app
        .as_customer(&app.customer, Method::POST, "/api/reviews", Some(review.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["review"]["serviceType"], "TOUR");
    assert_eq!(body["review"]["serviceId"], 7);

    let (status, body) = app
        .as_customer(&app.customer, Method::POST, "/api/reviews", Some(review))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Booking already rated");

    let (status, body) = app.send(Method::GET, "/api/reviews?serviceType=TOUR&serviceId=7", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviewCount"], 1);
    assert_eq!(body["averageRating"].as_f64(), Some(5.0));
}

// ============================================================================
// Multilingual content
// ============================================================================

#[tokio::test]
async fn test_blog_with_english_only_fills_other_languages() {
    let app = TestApp::new().await;

    let (status, body) = app
        .as_user(
            &app.admin,
            Method::POST,
            "/api/blogs",
            Some(json!({
                "title": {"en": "Ten days in the Atlas"},
                "content": {"en": "Mountains, valleys and mint tea."},
                "published": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let entry = &body["entry"];
    assert_eq!(entry["slug"], "ten-days-in-the-atlas");
    assert_eq!(entry["title"], "Ten days in the Atlas");
    assert_eq!(entry["translations"]["ENGLISH"]["title"], "Ten days in the Atlas");
    assert_eq!(entry["translations"]["ARABIC"]["title"], "");
    assert_eq!(entry["translations"]["ARABIC"]["content"], "");
    assert_eq!(entry["translations"]["FRENCH"]["title"], "");

    // Blank translations fall back to English when served.
    let id = entry["id"].as_i64().unwrap();
    let (status, body) = app.send(Method::GET, &format!("/api/blogs/{}?lang=fr", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["language"], "FRENCH");
    assert_eq!(body["title"], "Ten days in the Atlas");

    let (status, body) = app.send(Method::GET, "/api/blogs/slug/ten-days-in-the-atlas", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
}

#[tokio::test]
async fn test_content_validation_and_slugs() {
    let app = TestApp::new().await;

    let (status, body) = app
        .as_user(&app.admin, Method::POST, "/api/news", Some(json!({"title": {"ar": "خبر"}, "content": {"en": "x"}})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "English title is required");

    let payload = json!({"title": {"en": "Festival season"}, "content": {"en": "Dates announced"}});
    let (status, body) = app.as_user(&app.admin, Method::POST, "/api/news", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["entry"]["id"].as_i64().unwrap();

    let (status, body) = app.as_user(&app.admin, Method::POST, "/api/news", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    // Same slug is fine in another collection.
    let (status, _) = app.as_user(&app.admin, Method::POST, "/api/blogs", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .as_user(
            &app.admin,
            Method::PUT,
            &format!("/api/news/{}", id),
            Some(json!({"title": {"en": "Festival season 2025", "fr": "Saison des festivals"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry"]["slug"], "festival-season-2025");
    assert_eq!(body["entry"]["translations"]["FRENCH"]["title"], "Saison des festivals");
    assert_eq!(body["entry"]["content"], "Dates announced");

    let (status, _) = app
        .as_user(&app.customer, Method::POST, "/api/news", Some(json!({"title": {"en": "x"}, "content": {"en": "y"}})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_drafts_hidden_from_public() {
    let app = TestApp::new().await;

    let (_, body) = app
        .as_user(
            &app.admin,
            Method::POST,
            "/api/bundles",
            Some(json!({"title": {"en": "Imperial cities"}, "content": {"en": "Eight days"}, "price": 1200, "durationDays": 8})),
        )
        .await;
    let id = body["entry"]["id"].as_i64().unwrap();
    assert_eq!(body["entry"]["durationDays"], 8);

    let (status, _) = app.send(Method::GET, &format!("/api/bundles/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.as_user(&app.admin, Method::GET, &format!("/api/bundles/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send(Method::GET, "/api/bundles", None, None).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (status, body) = app
        .as_user(&app.admin, Method::GET, "/api/admin/bundles?published=false", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bundles"].as_array().unwrap().len(), 1);

    let (status, _) = app.as_user(&app.admin, Method::DELETE, &format!("/api/bundles/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.as_user(&app.admin, Method::DELETE, &format!("/api/bundles/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Admin listings and special offers
// ============================================================================

#[tokio::test]
async fn test_admin_booking_listing_filters() {
    let app = TestApp::new().await;
    let first = app.book_tour().await;
    app.book_tour().await;
    app.set_status(&app.admin, first, "CONFIRMED").await;

    let (status, _) = app.as_user(&app.customer, Method::GET, "/api/admin/bookings", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .as_user(&app.admin, Method::GET, "/api/admin/bookings?status=CONFIRMED", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["bookings"][0]["id"], first);

    let (_, body) = app
        .as_user(&app.admin, Method::GET, "/api/admin/bookings?search=AMINA@", None)
        .await;
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = app
        .as_user(&app.admin, Method::GET, &format!("/api/admin/bookings?userId={}", app.other_customer.id), None)
        .await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_admin_delete_booking() {
    let app = TestApp::new().await;
    let id = app.book_tour().await;

    let (status, _) = app
        .as_user(&app.guide, Method::DELETE, &format!("/api/admin/bookings/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .as_user(&app.admin, Method::DELETE, &format!("/api/admin/bookings/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .as_user(&app.admin, Method::DELETE, &format!("/api/admin/bookings/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_special_offers() {
    let app = TestApp::new().await;
    let today = Utc::now().date_naive();
    let live = json!({
        "title": "Umrah early bird",
        "discountPercent": 15,
        "serviceType": "UMRAH",
        "validFrom": (today - Duration::days(1)).to_string(),
        "validUntil": (today + Duration::days(10)).to_string()
    });
    let upcoming = json!({
        "title": "Summer tours",
        "discountPercent": 10,
        "validFrom": (today + Duration::days(30)).to_string(),
        "validUntil": (today + Duration::days(60)).to_string()
    });

    let (status, _) = app
        .as_user(&app.admin, Method::POST, "/api/admin/special-offers", Some(json!({"title": "x", "discountPercent": 150, "validFrom": "2025-01-01", "validUntil": "2025-02-01"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.as_user(&app.admin, Method::POST, "/api/admin/special-offers", Some(live)).await;
    assert_eq!(status, StatusCode::CREATED);
    let live_id = body["specialOffer"]["id"].as_i64().unwrap();
    let (status, _) = app.as_user(&app.admin, Method::POST, "/api/admin/special-offers", Some(upcoming)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.send(Method::GET, "/api/special-offers", None, None).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["specialOffers"][0]["title"], "Umrah early bird");

    let (_, body) = app.as_user(&app.admin, Method::GET, "/api/admin/special-offers", None).await;
    assert_eq!(body["pagination"]["total"], 2);

    let (status, body) = app
        .as_user(
            &app.admin,
            Method::PUT,
            &format!("/api/admin/special-offers/{}", live_id),
            Some(json!({"isActive": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["specialOffer"]["isActive"], false);

    let (_, body) = app.send(Method::GET, "/api/special-offers", None, None).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (status, _) = app
        .as_user(&app.customer, Method::DELETE, &format!("/api/admin/special-offers/{}", live_id), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
