#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use es_fluent::{Client, EsError, Method, Request, Response, Result, Transport};
use serde_json::{json, Map, Value};

struct ScrollContext {
    hits: Vec<Value>,
    offset: usize,
    size: usize,
}

#[derive(Default)]
struct State {
    indices: BTreeMap<String, BTreeMap<String, Value>>,
    scrolls: HashMap<String, ScrollContext>,
    next_scroll: u64,
    next_auto_id: u64,
    pits: Vec<String>,
    bulk_calls: usize,
    clear_calls: usize,
    log: Vec<Request>,
}

/// Single-node cluster kept in memory, answering the handful of endpoints the
/// client uses. Scroll ids change on every page and cleared ids answer 404.
#[derive(Clone)]
pub struct FakeCluster {
    version: String,
    state: Arc<Mutex<State>>,
    fail_bulk_call: Option<usize>,
    failed_clears: usize,
}

impl std::fmt::Debug for FakeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeCluster")
            .field("version", &self.version)
            .finish()
    }
}

fn reply(status: u16, body: Value) -> Response {
    Response {
        status,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

fn error_reply(status: u16, error_type: &str, reason: &str) -> Response {
    reply(
        status,
        json!({
            "error": {
                "root_cause": [{ "type": error_type, "reason": reason }],
                "type": error_type,
                "reason": reason
            },
            "status": status
        }),
    )
}

fn body_json(request: &Request) -> Value {
    request
        .body
        .as_ref()
        .map(|body| serde_json::from_str(body.as_str()).unwrap())
        .unwrap_or_else(|| json!({}))
}

/// Supports `match_all` and single-field `term` queries.
fn matches_query(source: &Value, query: Option<&Value>) -> bool {
    let Some(term) = query.and_then(|q| q.get("term")).and_then(Value::as_object) else {
        return true;
    };
    term.iter().all(|(field, expected)| {
        let expected = expected.get("value").unwrap_or(expected);
        source.get(field) == Some(expected)
    })
}

impl FakeCluster {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            state: Arc::new(Mutex::new(State::default())),
            fail_bulk_call: None,
            failed_clears: 0,
        }
    }

    /// Answers the `n`-th bulk call (1-based) with a 500.
    pub fn failing_bulk_call(mut self, n: usize) -> Self {
        self.fail_bulk_call = Some(n);
        self
    }

    /// Drops the connection on the first `n` scroll clears.
    pub fn failing_clears(mut self, n: usize) -> Self {
        self.failed_clears = n;
        self
    }

    pub fn client(&self) -> Client {
        Client::new(self.clone())
    }

    pub fn seed(&self, index: &str, docs: usize) {
        let mut state = self.state.lock().unwrap();
        let index = state.indices.entry(index.to_string()).or_default();
        for i in 0..docs {
            index.insert(format!("{:05}", i), json!({ "n": i, "even": i % 2 == 0 }));
        }
    }

    pub fn put(&self, index: &str, id: &str, source: Value) {
        let mut state = self.state.lock().unwrap();
        state
            .indices
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), source);
    }

    pub fn create_index(&self, index: &str) {
        let mut state = self.state.lock().unwrap();
        state.indices.entry(index.to_string()).or_default();
    }

    pub fn doc_count(&self, index: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.indices.get(index).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn get(&self, index: &str, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.indices.get(index).and_then(|docs| docs.get(id).cloned())
    }

    pub fn open_scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls.len()
    }

    pub fn open_pits(&self) -> usize {
        self.state.lock().unwrap().pits.len()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn major(&self) -> u64 {
        self.version
            .split('.')
            .next()
            .and_then(|major| major.parse().ok())
            .unwrap_or(0)
    }

    fn total(&self, value: usize) -> Value {
        if self.major() >= 7 {
            json!({ "value": value, "relation": "eq" })
        } else {
            json!(value)
        }
    }

    fn page(&self, ctx: &mut ScrollContext, scroll_id: &str, total: usize) -> Value {
        let end = (ctx.offset + ctx.size).min(ctx.hits.len());
        let hits = ctx.hits[ctx.offset..end].to_vec();
        ctx.offset = end;
        json!({
            "_scroll_id": scroll_id,
            "took": 1,
            "timed_out": false,
            "_shards": { "total": 1, "successful": 1, "failed": 0 },
            "hits": { "total": self.total(total), "max_score": null, "hits": hits }
        })
    }

    fn next_scroll_id(state: &mut State) -> String {
        state.next_scroll += 1;
        format!("scroll-{}", state.next_scroll)
    }

    fn search(&self, state: &mut State, request: &Request, indices: &str) -> Response {
        let names: Vec<String> = if indices == "_all" {
            state.indices.keys().cloned().collect()
        } else {
            indices.split(',').map(str::to_string).collect()
        };
        let body = body_json(request);
        let query = body.get("query");
        let size = body.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;

        let mut hits = Vec::new();
        for name in &names {
            let Some(docs) = state.indices.get(name) else {
                return error_reply(
                    404,
                    "index_not_found_exception",
                    &format!("no such index [{}]", name),
                );
            };
            for (id, source) in docs {
                if matches_query(source, query) {
                    hits.push(json!({
                        "_index": name,
                        "_type": "_doc",
                        "_id": id,
                        "_score": null,
                        "_source": source
                    }));
                }
            }
        }
        let total = hits.len();
        let scan = request.get_param("search_type") == Some("scan");

        if request.get_param("scroll").is_none() {
            let mut ctx = ScrollContext { hits, offset: 0, size };
            let mut page = self.page(&mut ctx, "", total);
            page.as_object_mut().unwrap().remove("_scroll_id");
            return reply(200, page);
        }

        let scroll_id = Self::next_scroll_id(state);
        let mut ctx = ScrollContext { hits, offset: 0, size };
        let page = if scan {
            json!({
                "_scroll_id": scroll_id,
                "took": 1,
                "timed_out": false,
                "hits": { "total": self.total(total), "max_score": 0.0, "hits": [] }
            })
        } else {
            self.page(&mut ctx, &scroll_id, total)
        };
        state.scrolls.insert(scroll_id, ctx);
        reply(200, page)
    }

    fn continue_scroll(&self, state: &mut State, request: &Request) -> Response {
        let body = body_json(request);
        let old_id = body["scroll_id"].as_str().unwrap_or_default().to_string();
        let Some(mut ctx) = state.scrolls.remove(&old_id) else {
            return error_reply(
                404,
                "search_context_missing_exception",
                &format!("No search context found for id [{}]", old_id),
            );
        };
        let scroll_id = Self::next_scroll_id(state);
        let total = ctx.hits.len();
        let page = self.page(&mut ctx, &scroll_id, total);
        state.scrolls.insert(scroll_id, ctx);
        reply(200, page)
    }

    fn clear_scroll(&self, state: &mut State, request: &Request) -> Response {
        let body = body_json(request);
        let ids: Vec<String> = match &body["scroll_id"] {
            Value::Array(ids) => ids
                .iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect(),
            Value::String(id) => vec![id.clone()],
            _ => Vec::new(),
        };
        let freed = ids
            .iter()
            .filter(|id| state.scrolls.remove(*id).is_some())
            .count();
        if freed == 0 {
            return reply(404, json!({ "succeeded": true, "num_freed": 0 }));
        }
        reply(200, json!({ "succeeded": true, "num_freed": freed }))
    }

    fn count(&self, state: &State, request: &Request, indices: &str) -> Response {
        let Some(docs) = state.indices.get(indices) else {
            return error_reply(404, "index_not_found_exception", "no such index");
        };
        let body = body_json(request);
        let count = docs
            .values()
            .filter(|source| matches_query(source, body.get("query")))
            .count();
        reply(200, json!({ "count": count }))
    }

    fn bulk(&self, state: &mut State, request: &Request, default_index: Option<&str>) -> Response {
        state.bulk_calls += 1;
        if self.fail_bulk_call == Some(state.bulk_calls) {
            return error_reply(500, "internal_server_error", "bulk rejected");
        }

        let body = request.body.as_ref().unwrap().as_str().to_string();
        let mut lines = body.lines();
        let mut items = Vec::new();
        let mut errors = false;

        while let Some(line) = lines.next() {
            let action_line: Map<String, Value> = serde_json::from_str(line).unwrap();
            let (action, meta) = action_line.into_iter().next().unwrap();
            let index = meta["_index"]
                .as_str()
                .or(default_index)
                .unwrap()
                .to_string();
            let id = match meta["_id"].as_str() {
                Some(id) => id.to_string(),
                None => {
                    state.next_auto_id += 1;
                    format!("auto-{}", state.next_auto_id)
                }
            };
            let docs = state.indices.entry(index.clone()).or_default();
            let exists = docs.contains_key(&id);

            let (status, result, error) = match action.as_str() {
                "index" => {
                    let source: Value = serde_json::from_str(lines.next().unwrap()).unwrap();
                    docs.insert(id.clone(), source);
                    if exists {
                        (200, "updated", None)
                    } else {
                        (201, "created", None)
                    }
                }
                "create" => {
                    let source: Value = serde_json::from_str(lines.next().unwrap()).unwrap();
                    if exists {
                        (
                            409,
                            "",
                            Some(json!({
                                "type": "version_conflict_engine_exception",
                                "reason": format!("[{}]: version conflict, document already exists", id),
                                "index": index
                            })),
                        )
                    } else {
                        docs.insert(id.clone(), source);
                        (201, "created", None)
                    }
                }
                "update" => {
                    let payload: Value = serde_json::from_str(lines.next().unwrap()).unwrap();
                    match docs.get_mut(&id) {
                        Some(Value::Object(existing)) => {
                            if let Some(Value::Object(partial)) = payload.get("doc") {
                                for (k, v) in partial {
                                    existing.insert(k.clone(), v.clone());
                                }
                            }
                            (200, "updated", None)
                        }
                        _ if payload["doc_as_upsert"] == json!(true) => {
                            docs.insert(id.clone(), payload["doc"].clone());
                            (201, "created", None)
                        }
                        _ => (
                            404,
                            "",
                            Some(json!({
                                "type": "document_missing_exception",
                                "reason": format!("[{}]: document missing", id)
                            })),
                        ),
                    }
                }
                "delete" => {
                    if docs.remove(&id).is_some() {
                        (200, "deleted", None)
                    } else {
                        (404, "not_found", None)
                    }
                }
                other => panic!("unexpected bulk action {}", other),
            };

            errors |= error.is_some();
            let mut item = json!({ "_index": index, "_id": id, "status": status });
            if !result.is_empty() {
                item["result"] = json!(result);
                item["_version"] = json!(1);
            }
            if let Some(error) = error {
                item["error"] = error;
            }
            let mut entry = Map::new();
            entry.insert(action, item);
            items.push(Value::Object(entry));
        }

        reply(200, json!({ "took": 3, "errors": errors, "items": items }))
    }
}

#[async_trait]
impl Transport for FakeCluster {
    async fn perform(&self, request: Request) -> Result<Response> {
        let mut state = self.state.lock().unwrap();
        state.log.push(request.clone());

        let segments: Vec<&str> = request
            .path
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let response = match (&request.method, segments.as_slice()) {
            (&Method::GET, []) => reply(
                200,
                json!({
                    "name": "node-1",
                    "cluster_name": "fake",
                    "cluster_uuid": "uuid-1",
                    "version": { "number": self.version, "lucene_version": "8.11.1" },
                    "tagline": "You Know, for Search"
                }),
            ),
            (&Method::POST, ["_search", "scroll"]) => self.continue_scroll(&mut state, &request),
            (&Method::DELETE, ["_search", "scroll"]) => {
                state.clear_calls += 1;
                if state.clear_calls <= self.failed_clears {
                    return Err(EsError::Connection("reset".to_string()));
                }
                self.clear_scroll(&mut state, &request)
            }
            (&Method::POST, [indices, "_search"]) | (&Method::POST, [indices, _, "_search"]) => {
                let indices = indices.to_string();
                self.search(&mut state, &request, &indices)
            }
            (&Method::POST, ["_search"]) => self.search(&mut state, &request, "_all"),
            (&Method::POST, [index, "_count"]) => {
                let index = index.to_string();
                self.count(&state, &request, &index)
            }
            (&Method::POST, [_, "_pit"]) => {
                state.next_scroll += 1;
                let id = format!("pit-{}", state.next_scroll);
                state.pits.push(id.clone());
                reply(200, json!({ "id": id }))
            }
            (&Method::DELETE, ["_pit"]) => {
                let id = body_json(&request)["id"].as_str().unwrap_or_default().to_string();
                let before = state.pits.len();
                state.pits.retain(|pit| *pit != id);
                let freed = before - state.pits.len();
                reply(200, json!({ "succeeded": freed > 0, "num_freed": freed }))
            }
            (&Method::POST, ["_bulk"]) => self.bulk(&mut state, &request, None),
            (&Method::POST, [index, "_bulk"]) | (&Method::POST, [index, _, "_bulk"]) => {
                let index = index.to_string();
                self.bulk(&mut state, &request, Some(&index))
            }
            _ => error_reply(400, "illegal_argument_exception", "unsupported request"),
        };
        Ok(response)
    }
}
