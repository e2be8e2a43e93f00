//! Integration Tests for the Reconciliation Engine
//!
//! These tests wire caches, composed selectors and a subscriber to a small
//! in-test store, the way an application would.

use std::sync::Arc;

use parking_lot::Mutex;
use test_log::test;

use cachet_core::async_props;
use cachet_core::cache::{Cache, CacheAction, CacheActionSource, CacheDefinition, CacheView, Limiter, RequestId};
use cachet_core::connect::{AppStateSubscriber, AsyncProps, SharedExecutor};
use cachet_core::select::{by_value, create_async_selector_flat, create_tracked_selector, AsyncSelector};

#[derive(Debug, Clone, PartialEq)]
struct Article {
    title: String,
}

fn article(title: &str) -> Article {
    Article { title: title.to_string() }
}

fn articles_on_server() -> Vec<Article> {
    vec![
        article("How to play the guitar"),
        article("20 intermediate guitar songs"),
        article("Piano starter"),
    ]
}

const USER_DETAILS: &str = "Hank";

#[derive(Debug, Default)]
struct AppState {
    query_string: String,
    articles: Cache<String, Vec<Article>, ()>,
    user_details: Cache<(), String, ()>,
}

type State = Arc<AppState>;

#[derive(Debug, Clone)]
enum Action {
    Articles(CacheAction<String, Vec<Article>, ()>),
    UserDetails(CacheAction<(), String, ()>),
    SetQueryString(String),
    ClearResults,
}

impl CacheActionSource<String, Vec<Article>, ()> for Action {
    fn as_cache_action(&self) -> Option<&CacheAction<String, Vec<Article>, ()>> {
        match self {
            Action::Articles(action) => Some(action),
            _ => None,
        }
    }
}

impl CacheActionSource<(), String, ()> for Action {
    fn as_cache_action(&self) -> Option<&CacheAction<(), String, ()>> {
        match self {
            Action::UserDetails(action) => Some(action),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    FetchArticles(String),
    FetchUserDetails,
}

#[derive(Clone)]
struct Caches {
    articles: CacheDefinition<State, String, Vec<Article>, ()>,
    user_details: CacheDefinition<State, (), String, ()>,
}

impl Caches {
    fn new() -> Self {
        Self {
            articles: CacheDefinition::new(
                "articles",
                |state: &State| &state.articles,
                by_value::<String>,
                Limiter::default(),
            ),
            user_details: CacheDefinition::new(
                "userDetails",
                |state: &State| &state.user_details,
                by_value::<()>,
                Limiter::default(),
            ),
        }
    }

    fn reduce(&self, state: &AppState, action: &Action) -> AppState {
        let articles = match action {
            Action::ClearResults => Cache::new(),
            _ => self.articles.reduce(&state.articles, action),
        };
        let query_string = match action {
            Action::SetQueryString(query_string) => query_string.clone(),
            _ => state.query_string.clone(),
        };
        AppState {
            query_string,
            articles,
            user_details: self.user_details.reduce(&state.user_details, action),
        }
    }
}

/// A store whose fetches complete only when flushed.
struct Store {
    caches: Caches,
    state: Mutex<State>,
    to_flush: Mutex<Vec<Action>>,
    executed: Mutex<Vec<Command>>,
}

impl Store {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            caches: Caches::new(),
            state: Mutex::new(Arc::new(AppState::default())),
            to_flush: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        })
    }

    fn state(&self) -> State {
        self.state.lock().clone()
    }

    fn dispatch(&self, action: Action) {
        let mut state = self.state.lock();
        *state = Arc::new(self.caches.reduce(&state, &action));
    }

    fn flush(&self) {
        let actions = std::mem::take(&mut *self.to_flush.lock());
        for action in actions {
            self.dispatch(action);
        }
    }

    fn execute(&self, command: Command) {
        self.executed.lock().push(command.clone());
        match command {
            Command::FetchArticles(query_string) => {
                let found = articles_on_server()
                    .into_iter()
                    .filter(|article| article.title.contains(&query_string))
                    .collect();
                let articles = &self.caches.articles;
                self.dispatch(Action::Articles(articles.await_value(query_string, "request-results".into(), ())));
                self.to_flush
                    .lock()
                    .push(Action::Articles(articles.receive_value("request-results".into(), found)));
            }
            Command::FetchUserDetails => {
                let user_details = &self.caches.user_details;
                self.dispatch(Action::UserDetails(user_details.await_value((), "fetch-user-details".into(), ())));
                self.to_flush.lock().push(Action::UserDetails(
                    user_details.receive_value("fetch-user-details".into(), USER_DETAILS.to_string()),
                ));
            }
        }
    }

    fn executed(&self) -> Vec<Command> {
        self.executed.lock().clone()
    }
}

async_props! {
    #[derive(Debug, Clone)]
    struct PageProps<State, (), Command> => PageValues {
        articles: Vec<Article>,
        user_details: String,
    }
}

type Subscriber = AppStateSubscriber<State, (), PageProps, String>;

fn connect(store: &Arc<Store>) -> Subscriber {
    let caches = &store.caches;

    let query_string: AsyncSelector<State, (), Command, String> =
        create_tracked_selector(|state: &State, _: &()| state.query_string.clone(), by_value::<String>);

    let articles: AsyncSelector<State, (), Command, Vec<Article>> = create_async_selector_flat(
        (query_string, caches.articles.selector()),
        |(query_string, cache): (String, CacheView<String, Vec<Article>, ()>)| {
            cache
                .get_for(query_string)
                .or_else_with(Command::FetchArticles)
        },
    );

    let user_details: AsyncSelector<State, (), Command, String> = create_async_selector_flat(
        (caches.user_details.selector(),),
        |(cache,): (CacheView<(), String, ()>,)| cache.get_for(()).or_else(Command::FetchUserDetails),
    );

    let reader = Arc::clone(store);
    let executor = Arc::clone(store);
    let executor: SharedExecutor<Command> = Arc::new(move |command: Command| executor.execute(command));

    AppStateSubscriber::new(
        move || reader.state(),
        executor,
        move |state: &State, props: &()| PageProps {
            articles: articles.select(state, props),
            user_details: user_details.select(state, props),
        },
        |state: &State, _: &()| state.query_string.clone(),
        (),
    )
}

/// What the consumer would render: the query string and the values.
fn rendered(subscriber: &Subscriber) -> (String, PageValues) {
    let connected = subscriber.snapshot().expect("connected");
    (connected.sync_props.clone(), connected.async_props.to_sync_props())
}

fn values(articles: Option<Vec<Article>>, user_details: Option<&str>) -> PageValues {
    PageValues {
        articles,
        user_details: user_details.map(str::to_string),
    }
}

/// The full lifecycle: initial fetch, background refresh and a new query.
#[test]
fn executes_commands_and_keeps_stale_values_across_refreshes() {
    let store = Store::new();
    let subscriber = connect(&store);

    subscriber.notify().unwrap();
    assert_eq!(rendered(&subscriber), (String::new(), values(None, None)));
    assert_eq!(
        store.executed(),
        vec![Command::FetchArticles(String::new()), Command::FetchUserDetails]
    );

    store.flush();
    subscriber.notify().unwrap();
    assert_eq!(
        rendered(&subscriber),
        (String::new(), values(Some(articles_on_server()), Some(USER_DETAILS)))
    );

    // Clearing the results refetches them, but the query is unchanged so
    // the old results stay on screen.
    store.dispatch(Action::ClearResults);
    assert!(!subscriber.notify().unwrap());
    assert_eq!(
        rendered(&subscriber),
        (String::new(), values(Some(articles_on_server()), Some(USER_DETAILS)))
    );
    assert_eq!(store.executed().len(), 3);

    store.flush();
    subscriber.notify().unwrap();
    assert_eq!(
        rendered(&subscriber),
        (String::new(), values(Some(articles_on_server()), Some(USER_DETAILS)))
    );

    // A new query makes the old results irrelevant.
    store.dispatch(Action::SetQueryString("guitar".to_string()));
    subscriber.notify().unwrap();
    assert_eq!(rendered(&subscriber), ("guitar".to_string(), values(None, Some(USER_DETAILS))));

    store.flush();
    subscriber.notify().unwrap();
    let guitar = articles_on_server().into_iter().take(2).collect();
    assert_eq!(
        rendered(&subscriber),
        ("guitar".to_string(), values(Some(guitar), Some(USER_DETAILS)))
    );
    assert_eq!(store.executed().last(), Some(&Command::FetchArticles("guitar".to_string())));
}

/// Two properties waiting on the same slot cause a single command.
#[test]
fn identical_lookups_execute_one_command() {
    async_props! {
        struct Twice<State, (), Command> => TwiceValues {
            first: String,
            second: String,
        }
    }

    let store = Store::new();
    let lookup = |store: &Arc<Store>| -> AsyncSelector<State, (), Command, String> {
        create_async_selector_flat(
            (store.caches.user_details.selector(),),
            |(cache,): (CacheView<(), String, ()>,)| cache.get_for(()).or_else(Command::FetchUserDetails),
        )
    };
    let (first, second) = (lookup(&store), lookup(&store));

    let reader = Arc::clone(&store);
    let executor = Arc::clone(&store);
    let executor: SharedExecutor<Command> = Arc::new(move |command: Command| executor.execute(command));
    let subscriber = AppStateSubscriber::new(
        move || reader.state(),
        executor,
        move |state: &State, props: &()| Twice {
            first: first.select(state, props),
            second: second.select(state, props),
        },
        |_: &State, _: &()| (),
        (),
    );

    // Both properties are pending before the pass.
    let state = store.state();
    let before = Twice {
        first: lookup(&store).select(&state, &()),
        second: lookup(&store).select(&state, &()),
    };
    assert!(before.first.value().is_pending() && before.second.value().is_pending());

    subscriber.notify().unwrap();
    assert_eq!(store.executed(), vec![Command::FetchUserDetails]);
    assert_eq!(
        subscriber.snapshot().unwrap().async_props.to_sync_props(),
        TwiceValues {
            first: None,
            second: None
        }
    );
}

/// A late answer to a preempted request is dropped.
#[test]
fn late_answer_to_a_preempted_request_is_dropped() {
    let store = Store::new();
    let articles = store.caches.articles.clone();

    store.dispatch(Action::Articles(articles.await_value("piano".into(), "request-1".into(), ())));
    store.dispatch(Action::Articles(articles.await_value("piano".into(), "request-2".into(), ())));
    let before = store.state();

    store.dispatch(Action::Articles(articles.receive_value("request-1".into(), vec![article("Stale")])));
    let after = store.state();
    assert!(after.articles.is_same(&before.articles));
    assert_eq!(
        articles.get_for(&after, &"piano".to_string()).and_then(|item| item.request_id()),
        Some(&RequestId::from("request-2"))
    );

    store.dispatch(Action::Articles(articles.receive_value("request-2".into(), vec![article("Fresh")])));
    let state = store.state();
    let item = articles.get_for(&state, &"piano".to_string()).unwrap();
    assert_eq!(item.value(), Some(&vec![article("Fresh")]));
}

/// Cache actions only touch their own cache.
#[test]
fn actions_are_scoped_to_their_cache() {
    let store = Store::new();
    let before = store.state();
    store.dispatch(Action::UserDetails(
        store.caches.user_details.await_value((), "fetch-user-details".into(), ()),
    ));
    let after = store.state();

    assert!(after.articles.is_same(&before.articles));
    assert_eq!(after.user_details.len(), 1);
}

/// Props compare by reference, so an unrelated state change is not a
/// change to the consumer.
#[test]
fn unrelated_state_changes_keep_the_props() {
    let store = Store::new();
    let subscriber = connect(&store);
    subscriber.notify().unwrap();
    store.flush();
    subscriber.notify().unwrap();
    let connected = subscriber.snapshot().unwrap();

    store.dispatch(Action::UserDetails(
        store.caches.user_details.receive_value("unknown".into(), "Nobody".to_string()),
    ));
    assert!(!subscriber.notify().unwrap());
    let again = subscriber.snapshot().unwrap();
    assert!(Arc::ptr_eq(&connected, &again));
    assert!(!again.async_props.has_changed_from(&connected.async_props));
}

mod staleness {
    use super::*;
    use test_log::test;
    use cachet_core::connect::PropMap;
    use cachet_core::select::AsyncValue;

    #[derive(Debug)]
    struct Slots {
        input: u32,
        slot: AsyncValue<&'static str, u32>,
    }

    type State = Arc<Slots>;
    type Props = PropMap<State, (), &'static str, u32>;

    fn shown(subscriber: &AppStateSubscriber<State, (), Props, ()>) -> Option<u32> {
        subscriber.snapshot().unwrap().async_props.to_sync_props()["s"]
    }

    /// A value with an unchanged tracked input survives a refresh, and is
    /// dropped once the input changes.
    #[test]
    fn stale_value_is_kept_until_its_input_changes() {
        let input: AsyncSelector<State, (), &'static str, u32> =
            create_tracked_selector(|state: &State, _: &()| state.input, by_value::<u32>);
        let s: AsyncSelector<State, (), &'static str, u32> = create_async_selector_flat(
            (input, |state: &State, _: &()| state.slot.clone()),
            |(_, slot): (u32, AsyncValue<&'static str, u32>)| slot,
        );

        let state = Arc::new(Mutex::new(Arc::new(Slots {
            input: 1,
            slot: AsyncValue::received(4),
        })));
        let reader = Arc::clone(&state);
        let executor: SharedExecutor<&'static str> = Arc::new(|command: &'static str| {
            panic!("unexpected command {command}");
        });
        let subscriber = AppStateSubscriber::new(
            move || reader.lock().clone(),
            executor,
            move |state: &State, props: &()| Props::new().with("s", s.select(state, props)),
            |_: &State, _: &()| (),
            (),
        );

        subscriber.notify().unwrap();
        assert_eq!(shown(&subscriber), Some(4));

        *state.lock() = Arc::new(Slots {
            input: 1,
            slot: AsyncValue::awaiting(),
        });
        assert!(!subscriber.notify().unwrap());
        assert_eq!(shown(&subscriber), Some(4));

        *state.lock() = Arc::new(Slots {
            input: 2,
            slot: AsyncValue::awaiting(),
        });
        assert!(subscriber.notify().unwrap());
        assert_eq!(shown(&subscriber), None);
    }
}
