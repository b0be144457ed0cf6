use serde_json::json;
use workorder_intake::clients::client_model::{ClientRecord, ClientRef};
use workorder_intake::clients::directory::{ClientDirectory, client_page, paginate, search};
use workorder_intake::notify::console::format_client_table;
use workorder_intake::upload::transport::{MockReply, MockTransport};
use workorder_intake::workflow::error::IntakeError;

const LIST: &str = "http://clients/list";
const CREATE: &str = "http://clients/create";

fn record(id: &str, name: &str) -> ClientRecord {
    ClientRecord {
        id: id.into(),
        clientname: name.into(),
        commission: "10".into(),
    }
}

fn directory_with(list_reply: MockReply) -> MockTransport {
    MockTransport::new().on_get(LIST, list_reply)
}

// =========================================================================
// Fetching
// =========================================================================

#[test]
fn ids_and_commissions_accept_strings_or_numbers() {
    let transport = directory_with(MockReply::json(
        200,
        json!([
            {"id": 1, "clientname": "Acme", "commission": 12.5},
            {"id": "2", "clientname": "Bolt", "commission": "7"},
            {"id": 3, "clientname": "Core", "commission": null}
        ]),
    ));
    let clients = ClientDirectory::new(&transport, LIST, CREATE)
        .fetch_clients()
        .unwrap();

    assert_eq!(clients.len(), 3);
    assert_eq!(clients[0].id, "1");
    assert_eq!(clients[0].commission, "12.5");
    assert_eq!(clients[1].id, "2");
    assert_eq!(clients[2].commission, "");
}

#[test]
fn null_body_is_an_empty_directory() {
    let transport = directory_with(MockReply::text(200, "null"));
    let clients = ClientDirectory::new(&transport, LIST, CREATE)
        .fetch_clients()
        .unwrap();
    assert!(clients.is_empty());
}

#[test]
fn failed_list_reports_status() {
    let transport = directory_with(MockReply::text(503, "down"));
    let err = ClientDirectory::new(&transport, LIST, CREATE)
        .fetch_clients()
        .unwrap_err();
    assert!(matches!(err, IntakeError::HttpStatus { status: 503, .. }));
}

#[test]
fn find_client_resolves_reference() {
    let transport = directory_with(MockReply::json(
        200,
        json!([{"id": 7, "clientname": "Acme", "commission": 5}]),
    ));
    let directory = ClientDirectory::new(&transport, LIST, CREATE);

    assert_eq!(
        directory.find_client("7").unwrap(),
        ClientRef {
            id: "7".into(),
            name: "Acme".into()
        }
    );
    assert!(matches!(
        directory.find_client("8").unwrap_err(),
        IntakeError::MissingInput(_)
    ));
}

// =========================================================================
// Creating
// =========================================================================

#[test]
fn create_posts_trimmed_values() {
    let transport = MockTransport::new().on_post(CREATE, MockReply::json(201, json!({"id": 4})));
    ClientDirectory::new(&transport, LIST, CREATE)
        .create_client("  New Co ", " 15 ")
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].json,
        Some(json!({"company_name": "New Co", "commission": "15"}))
    );
}

#[test]
fn create_requires_both_values() {
    let transport = MockTransport::new();
    let directory = ClientDirectory::new(&transport, LIST, CREATE);

    assert!(matches!(
        directory.create_client("  ", "15").unwrap_err(),
        IntakeError::MissingInput(_)
    ));
    assert!(matches!(
        directory.create_client("New Co", "").unwrap_err(),
        IntakeError::MissingInput(_)
    ));
    assert!(transport.requests().is_empty());
}

#[test]
fn create_rejection_is_an_error() {
    let transport = MockTransport::new().on_post(CREATE, MockReply::text(500, ""));
    let err = ClientDirectory::new(&transport, LIST, CREATE)
        .create_client("New Co", "15")
        .unwrap_err();
    assert!(matches!(err, IntakeError::HttpStatus { status: 500, .. }));
}

// =========================================================================
// Search and paging
// =========================================================================

#[test]
fn search_is_case_insensitive_substring() {
    let clients = vec![record("1", "Acme Ltd"), record("2", "Bolt"), record("3", "ACME North")];

    let hits: Vec<&str> = search(&clients, "acme").iter().map(|c| c.id.as_str()).collect();
    assert_eq!(hits, vec!["1", "3"]);
    assert_eq!(search(&clients, "  ").len(), 3);
    assert!(search(&clients, "zzz").is_empty());
}

#[test]
fn paginate_slices_pages() {
    let rows: Vec<u32> = (1..=23).collect();

    let (total, page) = paginate(&rows, 1, 10);
    assert_eq!(total, 3);
    assert_eq!(page, &rows[0..10]);

    let (_, page) = paginate(&rows, 3, 10);
    assert_eq!(page, &[21, 22, 23]);

    let (_, page) = paginate(&rows, 4, 10);
    assert!(page.is_empty());

    // Page 0 is treated as the first page
    let (_, page) = paginate(&rows, 0, 10);
    assert_eq!(page[0], 1);
}

#[test]
fn empty_table_says_so() {
    let page = client_page(&[], 1, 10);
    assert_eq!(page.total_pages, 0);

    let text = format_client_table(&page);
    assert!(text.contains("No data available"));
    assert!(text.ends_with("Page 1 of 0\n"));
}

#[test]
fn table_lists_rows_of_the_page() {
    let clients: Vec<ClientRecord> = (1..=12)
        .map(|i| record(&i.to_string(), &format!("Client {}", i)))
        .collect();
    let page = client_page(&clients, 2, 10);

    let text = format_client_table(&page);
    assert!(text.contains("Client 11"));
    assert!(text.contains("Client 12"));
    assert!(!text.contains("Client 1 "));
    assert!(text.ends_with("Page 2 of 2\n"));
}
