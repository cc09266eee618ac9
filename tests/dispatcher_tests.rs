//! Tests for routing priority, parameter capture, and the fault boundary.

mod common;

use http::Method;
use tunedeck::dispatcher::{Dispatcher, HandlerError, HandlerRequest, HandlerResponse};
use tunedeck::ids::RequestId;

fn request(method: Method, path: &str) -> HandlerRequest {
    HandlerRequest {
        request_id: RequestId::new(),
        method,
        path: path.to_string(),
        path_params: Default::default(),
        query_params: Default::default(),
        headers: Default::default(),
        body: None,
    }
}

fn demo_dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_route(Method::GET, "/a", "list_a", |_req: &HandlerRequest| {
        Ok(HandlerResponse::json(200, serde_json::json!({ "route": "list" })))
    });
    dispatcher.add_route(Method::GET, "/a/:id", "get_a", |req: &HandlerRequest| {
        Ok(HandlerResponse::json(
            200,
            serde_json::json!({ "route": "get", "id": req.get_path_param("id") }),
        ))
    });
    dispatcher
}

#[test]
fn literal_route_wins_for_exact_path() {
    let dispatcher = demo_dispatcher();
    let mut req = request(Method::GET, "/a");
    let res = dispatcher.dispatch(&mut req);
    assert_eq!(res.status, 200);
    assert_eq!(res.body["route"], "list");
}

#[test]
fn parameterized_route_captures_id() {
    let dispatcher = demo_dispatcher();
    let mut req = request(Method::GET, "/a/42");
    let res = dispatcher.dispatch(&mut req);
    assert_eq!(res.status, 200);
    assert_eq!(res.body["route"], "get");
    assert_eq!(res.body["id"], "42");
    // The capture landed in the request's own parameter space too.
    assert_eq!(req.get_path_param("id"), Some("42"));
}

#[test]
fn unregistered_method_is_not_found() {
    let dispatcher = demo_dispatcher();
    let mut req = request(Method::POST, "/a");
    let res = dispatcher.dispatch(&mut req);
    assert_eq!(res.status, 404);
    assert_eq!(res.body["error"], "Not found");
}

#[test]
fn handler_fault_becomes_internal_error_and_dispatcher_survives() {
    let mut dispatcher = demo_dispatcher();
    dispatcher.add_route(Method::GET, "/fault", "fault", |_req: &HandlerRequest| {
        Err(HandlerError::msg("store unavailable"))
    });
    dispatcher.add_route(Method::GET, "/panic", "panic", |_req: &HandlerRequest| {
        panic!("bug in business logic");
    });

    let mut req = request(Method::GET, "/fault");
    assert_eq!(dispatcher.dispatch(&mut req).status, 500);

    let mut req = request(Method::GET, "/panic");
    assert_eq!(dispatcher.dispatch(&mut req).status, 500);

    // The same dispatcher keeps serving healthy routes afterwards.
    let mut req = request(Method::GET, "/a");
    assert_eq!(dispatcher.dispatch(&mut req).status, 200);
}

#[test]
fn earlier_registration_shadows_later_overlap() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_route(Method::GET, "/x/:id", "first", |_req: &HandlerRequest| {
        Ok(HandlerResponse::json(200, serde_json::json!({ "which": "first" })))
    });
    dispatcher.add_route(Method::GET, "/x/special", "second", |_req: &HandlerRequest| {
        Ok(HandlerResponse::json(200, serde_json::json!({ "which": "second" })))
    });

    let mut req = request(Method::GET, "/x/special");
    let res = dispatcher.dispatch(&mut req);
    assert_eq!(res.body["which"], "first");
}

#[test]
fn trailing_slash_and_query_are_tolerated() {
    let dispatcher = demo_dispatcher();

    let mut req = request(Method::GET, "/a/");
    assert_eq!(dispatcher.dispatch(&mut req).status, 200);

    // The session strips the query before dispatch; a stray one must not
    // break matching either.
    let mut req = request(Method::GET, "/a?limit=5");
    assert_eq!(dispatcher.dispatch(&mut req).status, 200);
}
