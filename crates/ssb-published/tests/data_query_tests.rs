//! Data query tests against a mock PxWeb server.

use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ssb_published::{
    ClientError, Config, DataQueryRunner, DataSummary, MetadataFilter, QueryError, SsbClient,
    build_query,
};

const TABLE_PATH: &str = "/api/v0/no/table/12367";

fn metadata() -> Value {
    json!({
        "title": "12367: Kommuneregnskap",
        "variables": [
            {"code": "KOKregnskapsomfa0000", "text": "regnskapsomfang",
             "values": ["A", "B"], "valueTexts": ["Konsern", "Kommune"]},
            {"code": "Region", "text": "region",
             "values": ["0301", "1103", "4601"], "valueTexts": ["Oslo", "Stavanger", "Bergen"]},
            {"code": "KOKart0000", "text": "art",
             "values": ["AG1", "AG2"], "valueTexts": ["a", "b"]},
            {"code": "Tid", "text": "år", "values": ["2021", "2022"],
             "valueTexts": ["2021", "2022"], "time": true}
        ]
    })
}

fn dataset(regions: usize) -> Value {
    json!({
        "class": "dataset",
        "label": "12367: Kommuneregnskap",
        "id": ["KOKregnskapsomfa0000", "Region", "KOKart0000", "Tid"],
        "size": [1, regions, 2, 1],
        "value": vec![Value::Null; regions * 2],
        "dimension": {}
    })
}

async fn mount_metadata(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata()))
        .expect(1)
        .mount(mock_server)
        .await;
}

fn setup(mock_server: &MockServer, max_rows: usize) -> (DataQueryRunner, SsbClient) {
    let config = Config::for_testing(&mock_server.uri()).with_max_query_rows(max_rows);
    let runner = DataQueryRunner::from_config(&config);
    (runner, SsbClient::new(config).unwrap())
}

async fn posted_bodies(mock_server: &MockServer) -> Vec<Value> {
    mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| r.body_json::<Value>().unwrap())
        .collect()
}

fn selection<'a>(body: &'a Value, code: &str) -> &'a Value {
    body["query"]
        .as_array()
        .unwrap()
        .iter()
        .find(|q| q["code"] == code)
        .map(|q| &q["selection"]["values"])
        .unwrap()
}

#[tokio::test]
async fn test_data_query_posts_json_stat2_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(body_partial_json(json!({"response": {"format": "json-stat2"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset(3)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_, client) = setup(&mock_server, 800_000);
    let meta = serde_json::from_value(metadata()).unwrap();
    let result = assert_ok!(client.data_query(12367, &build_query(&meta)).await);

    assert_eq!(result.cell_count(), 6);
    assert_eq!(result.missing_count(), 6);

    let bodies = posted_bodies(&mock_server).await;
    assert_eq!(selection(&bodies[0], "KOKregnskapsomfa0000"), &json!(["A"]));
    assert_eq!(bodies[0]["query"][0]["selection"]["filter"], "item");
}

#[tokio::test]
async fn test_data_query_rejected_selection_is_bad_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("Too many values selected"))
        .mount(&mock_server)
        .await;

    let (_, client) = setup(&mock_server, 800_000);
    let meta = serde_json::from_value(metadata()).unwrap();
    let err = assert_err!(client.data_query(12367, &build_query(&meta)).await);

    assert!(matches!(err, ClientError::BadRequest { ref message } if message.contains("Too many")));
}

#[tokio::test]
async fn test_runner_posts_one_query_per_year() {
    let mock_server = MockServer::start().await;
    mount_metadata(&mock_server).await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset(3)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (runner, client) = setup(&mock_server, 800_000);
    let mut out = Vec::new();
    let summary = assert_ok!(runner.run(&client, 12367, None, &mut out).await);

    assert_eq!(summary, DataSummary { queries: 2, cells: 12, missing: 12 });

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["class"], "dataset");
    assert!(lines[0].get("dimension").is_some());

    let bodies = posted_bodies(&mock_server).await;
    assert_eq!(selection(&bodies[0], "Tid"), &json!(["2021"]));
    assert_eq!(selection(&bodies[1], "Tid"), &json!(["2022"]));
    assert_eq!(selection(&bodies[1], "Region"), &json!(["0301", "1103", "4601"]));
}

#[tokio::test]
async fn test_runner_batches_regions_under_row_limit() {
    let mock_server = MockServer::start().await;
    mount_metadata(&mock_server).await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset(1)))
        .mount(&mock_server)
        .await;

    // Row size without Region/Tid is 2 * 2 = 4, so a limit of 10 fits two
    // regions per query.
    let (runner, client) = setup(&mock_server, 10);
    let filter: MetadataFilter = "Tid=2022".parse().unwrap();
    let mut out = Vec::new();
    let summary = assert_ok!(runner.run(&client, 12367, Some(&filter), &mut out).await);

    assert_eq!(summary.queries, 2);

    let bodies = posted_bodies(&mock_server).await;
    assert_eq!(selection(&bodies[0], "Region"), &json!(["0301", "1103"]));
    assert_eq!(selection(&bodies[1], "Region"), &json!(["4601"]));
    assert!(bodies.iter().all(|b| selection(b, "Tid") == &json!(["2022"])));
}

#[tokio::test]
async fn test_runner_unknown_filter_value_posts_nothing() {
    let mock_server = MockServer::start().await;
    mount_metadata(&mock_server).await;

    let (runner, client) = setup(&mock_server, 800_000);
    let filter: MetadataFilter = "Region=9999".parse().unwrap();
    let mut out = Vec::new();
    let err = assert_err!(runner.run(&client, 12367, Some(&filter), &mut out).await);

    assert!(matches!(err, ClientError::Query(QueryError::UnknownValue { .. })));
    assert!(out.is_empty());
    assert!(posted_bodies(&mock_server).await.is_empty());
}

#[tokio::test]
async fn test_runner_stops_on_first_failed_query() {
    let mock_server = MockServer::start().await;
    mount_metadata(&mock_server).await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (runner, client) = setup(&mock_server, 800_000);
    let mut out = Vec::new();
    let err = assert_err!(runner.run(&client, 12367, None, &mut out).await);

    assert_eq!(err.status(), Some(503));
    assert!(out.is_empty());
}
