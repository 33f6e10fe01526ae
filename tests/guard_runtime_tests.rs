use async_trait::async_trait;
use learning_portal::{
    guards::{
        AuthProvider, AuthSession, GuardOutcome, GuardRuntime, History, Navigation, Navigator,
        Role, RouteTable, SessionUser, View,
    },
    models::{AdminDashboardStats, Comment, Course, CourseOutline, Progress, User},
    repository::Repository,
};
use std::{sync::Mutex, time::Duration};
use tokio::sync::watch;
use uuid::Uuid;

// --- TEST UTILITIES ---

/// Navigator that only records what it was asked to do.
#[derive(Default)]
struct RecordingNavigator {
    calls: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    fn calls(&self) -> Vec<Navigation> {
        self.calls.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, navigation: &Navigation) {
        self.calls.lock().unwrap().push(navigation.clone());
    }
}

struct ProfileRepo {
    profile: Option<User>,
}

#[async_trait]
impl Repository for ProfileRepo {
    async fn get_user(&self, _id: Uuid) -> Option<User> {
        self.profile.clone()
    }
    async fn create_user(&self, _user: User) -> Option<User> {
        None
    }
    async fn get_stats(&self) -> AdminDashboardStats {
        AdminDashboardStats::default()
    }
    async fn get_courses(&self) -> Vec<Course> {
        vec![]
    }
    async fn get_all_courses(&self) -> Vec<Course> {
        vec![]
    }
    async fn get_course_outline(&self, _id: Uuid, _all: bool) -> Option<CourseOutline> {
        None
    }
    async fn set_course_status(&self, _id: Uuid, _published: bool) -> Option<Course> {
        None
    }
    async fn add_comment(&self, _s: Uuid, _u: Uuid, _text: String) -> Option<Comment> {
        None
    }
    async fn get_comments(&self, _s: Uuid) -> Vec<Comment> {
        vec![]
    }
    async fn delete_comment(&self, _id: i64, _user_id: Uuid) -> bool {
        false
    }
    async fn delete_comment_admin(&self, _id: i64) -> bool {
        false
    }
    async fn mark_complete(&self, _u: Uuid, _s: Uuid) -> Option<Progress> {
        None
    }
    async fn get_progress(&self, _u: Uuid) -> Vec<Progress> {
        vec![]
    }
}

const USER_ID: Uuid = Uuid::from_u128(42);

fn session_user() -> SessionUser {
    SessionUser {
        id: USER_ID,
        email: None,
    }
}

fn admin() -> AuthSession {
    AuthSession::signed_in(session_user(), Some(Role::Admin))
}

fn student() -> AuthSession {
    AuthSession::signed_in(session_user(), Some(Role::Student))
}

async fn wait_for_outcome(
    rx: &mut watch::Receiver<Option<GuardOutcome>>,
    predicate: impl FnMut(&Option<GuardOutcome>) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("guard runtime did not publish the expected outcome in time")
        .expect("guard runtime stopped");
}

// --- GuardRuntime::evaluate ---

#[test]
fn test_no_navigation_while_loading() {
    let mut runtime = GuardRuntime::new(RouteTable::default(), RecordingNavigator::default());

    for path in ["/", "/admin", "/courses"] {
        let outcome = runtime.evaluate(&AuthSession::loading(), path);
        assert_eq!(outcome.view, View::Loading);
    }
    assert!(runtime.navigator().calls().is_empty());
}

#[test]
fn test_admin_on_home_navigates_exactly_once() {
    let mut runtime = GuardRuntime::new(RouteTable::default(), RecordingNavigator::default());

    // Re-renders with the same inputs must not stack navigations.
    for _ in 0..3 {
        let outcome = runtime.evaluate(&admin(), "/");
        assert_eq!(outcome.view, View::Nothing);
    }

    assert_eq!(runtime.navigator().calls(), vec![Navigation::replace("/admin")]);
}

#[test]
fn test_loading_to_admin_transition_navigates_once() {
    let mut runtime = GuardRuntime::new(RouteTable::default(), RecordingNavigator::default());

    runtime.evaluate(&AuthSession::loading(), "/");
    assert!(runtime.navigator().calls().is_empty());

    runtime.evaluate(&admin(), "/");
    assert_eq!(runtime.navigator().calls().len(), 1);
}

#[test]
fn test_student_on_home_never_navigates() {
    let mut runtime = GuardRuntime::new(RouteTable::default(), RecordingNavigator::default());

    let outcome = runtime.evaluate(&student(), "/");
    assert_eq!(outcome, GuardOutcome::render(View::Children));
    assert!(runtime.navigator().calls().is_empty());
}

#[test]
fn test_navigation_is_reissued_after_leaving_redirect_state() {
    let mut runtime = GuardRuntime::new(RouteTable::default(), RecordingNavigator::default());

    runtime.evaluate(&admin(), "/");
    runtime.evaluate(&admin(), "/admin");
    // Back on the landing page: a new transition, so a new navigation.
    runtime.evaluate(&admin(), "/");

    assert_eq!(runtime.navigator().calls().len(), 2);
}

#[test]
fn test_same_redirect_from_new_path_is_issued_again() {
    let mut runtime = GuardRuntime::new(RouteTable::default(), RecordingNavigator::default());

    // The redirect home from "/admin" lands, but the student moves on to another admin
    // page before the landing on "/" is ever evaluated.
    runtime.evaluate(&student(), "/admin");
    let outcome = runtime.evaluate(&student(), "/admin/stats");

    assert_eq!(outcome.view, View::AccessDenied);
    assert_eq!(
        runtime.navigator().calls(),
        vec![Navigation::replace("/"), Navigation::replace("/")]
    );
}

#[test]
fn test_student_is_sent_home_again_after_skipping_past_redirect() {
    let history = History::new("/admin");
    let mut runtime = GuardRuntime::new(RouteTable::default(), history.clone());

    runtime.evaluate(&student(), "/admin");
    assert_eq!(history.current(), "/");

    history.push("/admin/stats");
    runtime.evaluate(&student(), &history.current());

    assert_eq!(history.current(), "/");
    assert_eq!(history.entries(), vec!["/".to_string(), "/".to_string()]);
}

#[test]
fn test_history_applies_replacing_navigation() {
    let history = History::new("/");
    let mut runtime = GuardRuntime::new(RouteTable::default(), history.clone());

    runtime.evaluate(&admin(), "/");

    assert_eq!(history.current(), "/admin");
    assert_eq!(history.entries(), vec!["/admin".to_string()]);
}

#[test]
fn test_history_back_never_pops_first_entry() {
    let history = History::new("/");
    history.push("/courses");
    history.back();
    history.back();
    assert_eq!(history.entries(), vec!["/".to_string()]);
}

// --- AuthProvider ---

#[test]
fn test_auth_provider_starts_loading() {
    let provider = AuthProvider::new();
    assert_eq!(provider.snapshot(), AuthSession::loading());
}

#[test]
fn test_auth_provider_reenters_loading_on_auth_event() {
    let provider = AuthProvider::new();
    provider.resolve(session_user(), Some(Role::Admin));
    assert!(!provider.snapshot().loading);

    provider.begin_resolution();
    let session = provider.snapshot();
    assert!(session.loading);
    // The previous identity is kept, but is not final.
    assert!(session.is_admin());

    provider.sign_out();
    assert_eq!(provider.snapshot(), AuthSession::signed_out());
}

#[tokio::test]
async fn test_resolve_from_profiles_publishes_role() {
    let provider = AuthProvider::new();
    let repo = ProfileRepo {
        profile: Some(User {
            id: USER_ID,
            email: "boss@example.com".to_string(),
            role: "admin".to_string(),
        }),
    };

    provider.resolve_from_profiles(&repo, USER_ID).await;

    let session = provider.snapshot();
    assert!(!session.loading);
    assert_eq!(session.role, Some(Role::Admin));
    assert_eq!(
        session.user.and_then(|u| u.email),
        Some("boss@example.com".to_string())
    );
}

#[tokio::test]
async fn test_resolve_from_profiles_without_profile_has_no_role() {
    let provider = AuthProvider::new();
    provider
        .resolve_from_profiles(&ProfileRepo { profile: None }, USER_ID)
        .await;

    let session = provider.snapshot();
    assert!(!session.loading);
    assert!(session.has_user());
    assert_eq!(session.role, None);
}

// --- GuardRuntime::run ---

#[tokio::test]
async fn test_runtime_follows_session_into_admin_area() {
    let provider = AuthProvider::new();
    let history = History::new("/");
    let (outcomes_tx, mut outcomes_rx) = watch::channel(None);

    let runtime = GuardRuntime::new(RouteTable::default(), history.clone());
    let handle = tokio::spawn(runtime.run(provider.subscribe(), history.subscribe(), outcomes_tx));

    wait_for_outcome(&mut outcomes_rx, |o| {
        o.as_ref().map(|o| o.view) == Some(View::Loading)
    })
    .await;
    assert_eq!(history.current(), "/");

    provider.resolve(session_user(), Some(Role::Admin));

    // Redirected from "/" and then re-evaluated on "/admin".
    wait_for_outcome(&mut outcomes_rx, |o| {
        o.as_ref().map(|o| o.view) == Some(View::Children)
    })
    .await;
    assert_eq!(history.entries(), vec!["/admin".to_string()]);

    drop(provider);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("guard runtime did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_runtime_sends_student_home_from_admin_area() {
    let provider = AuthProvider::new();
    provider.resolve(session_user(), Some(Role::Student));
    let history = History::new("/");
    history.push("/admin/courses");
    let (outcomes_tx, mut outcomes_rx) = watch::channel(None);

    let runtime = GuardRuntime::new(RouteTable::default(), history.clone());
    let handle = tokio::spawn(runtime.run(provider.subscribe(), history.subscribe(), outcomes_tx));

    // Student lands on "/" and sees the landing page.
    wait_for_outcome(&mut outcomes_rx, |o| {
        o.as_ref().map(|o| o.view) == Some(View::Children)
    })
    .await;
    assert_eq!(history.current(), "/");
    assert_eq!(history.entries(), vec!["/".to_string(), "/".to_string()]);

    drop(provider);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("guard runtime did not stop")
        .unwrap();
}
