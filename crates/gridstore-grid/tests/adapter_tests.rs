//! Integration tests for GridAdapter over the in-memory transport

use gridstore_common::{GridStoreConfig, GridStoreError};
use gridstore_grid::{
    GridAdapter, ListOptions, MemoryTransport, Method, RowData, RowUpdate, SheetSelector,
};
use serde_json::Value;
use std::sync::Arc;

const SPREADSHEET: &str = "sheet-test";

fn setup(transport: MemoryTransport) -> (Arc<MemoryTransport>, GridAdapter) {
    let _ = tracing_subscriber::fmt::try_init();
    let transport = Arc::new(transport);
    let adapter = GridAdapter::new(transport.clone(), &GridStoreConfig::new(SPREADSHEET));
    (transport, adapter)
}

fn people() -> MemoryTransport {
    MemoryTransport::new(SPREADSHEET).with_rows(vec![
        vec!["name", "age"],
        vec!["ann", "31"],
        vec!["bob", "25"],
        vec!["cid", "40"],
    ])
}

#[tokio::test]
async fn test_load_is_cached_until_invalidated() {
    let (transport, adapter) = setup(people());

    adapter.get_sheet(None).await.unwrap();
    adapter.list(&ListOptions::new()).await.unwrap();
    assert_eq!(transport.call_count(Method::SpreadsheetsGet), 1);
    assert!(adapter.is_cached());

    adapter.invalidate();
    adapter.get_sheet(None).await.unwrap();
    assert_eq!(transport.call_count(Method::SpreadsheetsGet), 2);
}

#[tokio::test]
async fn test_load_failure_degrades_to_no_data() {
    let (transport, adapter) = setup(people());
    transport.fail_next(1);

    assert!(adapter.load().await.is_none());
    assert!(!adapter.is_cached());

    // Next read retries and succeeds
    let sheet = adapter.get_sheet(None).await.unwrap();
    assert_eq!(sheet.title, "Sheet1");
}

#[tokio::test]
async fn test_failed_load_keeps_its_cause() {
    let (transport, adapter) = setup(people());
    transport.fail_next(1);

    let err = adapter.get_sheet(None).await.unwrap_err();
    assert!(err.is_transport());
    assert!(!err.is_not_found());

    transport.fail_next(1);
    let err = adapter.list(&ListOptions::new()).await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_get_sheet_resolution() {
    let (_, adapter) = setup(people().with_sheet(7, "Orders", 100, 10).with_sheet(8, "7", 10, 5));

    assert_eq!(adapter.get_sheet(None).await.unwrap().sheet_id, 0);
    assert_eq!(
        adapter.get_sheet(Some(&SheetSelector::Id(7))).await.unwrap().title,
        "Orders"
    );
    assert_eq!(
        adapter.get_sheet(Some(&"Orders".into())).await.unwrap().sheet_id,
        7
    );
    // A numeric title resolves by id first
    assert_eq!(adapter.get_sheet(Some(&"7".into())).await.unwrap().title, "Orders");

    let err = adapter.get_sheet(Some(&"Missing".into())).await.unwrap_err();
    assert!(matches!(err, GridStoreError::NotFound(_)));
}

#[tokio::test]
async fn test_default_sheet_from_config() {
    let transport = Arc::new(people().with_sheet(3, "Orders", 100, 10));
    let config = GridStoreConfig::new(SPREADSHEET).default_sheet("Orders");
    let adapter = GridAdapter::new(transport, &config);

    assert_eq!(adapter.get_sheet(None).await.unwrap().sheet_id, 3);
}

#[tokio::test]
async fn test_list_from_snapshot() {
    let (transport, adapter) = setup(people());

    let rows = adapter
        .list(&ListOptions::new().start(2).limit(2))
        .await
        .unwrap();
    assert_eq!(rows, vec![vec!["ann", "31"], vec!["bob", "25"]]);
    assert_eq!(transport.call_count(Method::ValuesGet), 0);

    assert!(adapter.list(&ListOptions::new().limit(0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_fresh_reads_range() {
    let (transport, adapter) = setup(people());

    let rows = adapter
        .list(&ListOptions::new().limit(1).fresh(true))
        .await
        .unwrap();
    assert_eq!(rows, vec![vec!["name", "age"]]);

    let calls = transport.calls();
    let (method, params) = calls.last().unwrap();
    assert_eq!(*method, Method::ValuesGet);
    assert_eq!(params["range"], "'Sheet1'!A1:ZZ1");
}

#[tokio::test]
async fn test_append_reports_rows_and_invalidates() {
    let (transport, adapter) = setup(people());
    adapter.load().await.unwrap();

    let result = adapter
        .append(
            &[RowData::values(["dee", "28"]), RowData::sparse([("B", "50")])],
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.start_row, 5);
    assert_eq!(result.end_row, 6);
    assert_eq!(result.count, 2);
    assert!(!adapter.is_cached());
    assert_eq!(transport.rows(0)[4], vec!["dee", "28"]);
    assert_eq!(transport.rows(0)[5], vec!["", "50"]);
}

#[tokio::test]
async fn test_append_off_column_a_is_reanchored() {
    let (transport, adapter) = setup(people());
    transport.set_append_column_offset(2);
    transport.clear_calls();

    let result = adapter
        .append(&[RowData::values(["dee", "28"]), RowData::values(["eve", "33"])], None)
        .await
        .unwrap();
    assert_eq!(result.start_row, 5);

    let corrections: Vec<Value> = transport
        .calls()
        .into_iter()
        .filter(|(m, _)| *m == Method::ValuesBatchUpdate)
        .map(|(_, p)| p)
        .collect();
    assert_eq!(corrections.len(), 1);

    let data = &corrections[0]["resource"]["data"];
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["range"], "'Sheet1'!A5:D6");
    // Two values plus start column (C = 3) minus one of padding
    assert_eq!(data[0]["values"][0], serde_json::json!(["dee", "28", "", ""]));

    assert_eq!(transport.rows(0)[4], vec!["dee", "28"]);
    assert_eq!(transport.rows(0)[5], vec!["eve", "33"]);
}

#[tokio::test]
async fn test_update_upsert_expands_before_writing() {
    let (transport, adapter) = setup(people());
    transport.resize(0, 4, 2);
    transport.clear_calls();

    let count = adapter
        .update(
            &[RowUpdate::new(6, RowData::values(["fay", "22", "x"]))],
            None,
            true,
        )
        .await
        .unwrap();
    assert_eq!(count, 1);

    let methods: Vec<Method> = transport
        .calls()
        .into_iter()
        .map(|(m, _)| m)
        .filter(|m| m.is_mutation())
        .collect();
    assert_eq!(methods, vec![Method::BatchUpdate, Method::ValuesBatchUpdate]);
    assert_eq!(transport.dimensions(0), Some((6, 3)));
    assert_eq!(transport.rows(0)[5], vec!["fay", "22", "x"]);
}

#[tokio::test]
async fn test_update_without_upsert_is_rejected_out_of_bounds() {
    let (transport, adapter) = setup(people());
    transport.resize(0, 4, 2);

    let err = adapter
        .update(&[RowUpdate::new(6, RowData::values(["fay"]))], None, false)
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(transport.call_count(Method::BatchUpdate), 0);
}

#[tokio::test]
async fn test_sparse_update_leaves_other_cells() {
    let (transport, adapter) = setup(people());

    adapter
        .update(&[RowUpdate::new(3, RowData::sparse([(2u32, "26")]))], None, true)
        .await
        .unwrap();
    assert_eq!(transport.rows(0)[2], vec!["bob", "26"]);

    let (_, params) = transport.calls().pop().unwrap();
    assert_eq!(params["resource"]["data"][0]["range"], "'Sheet1'!A3:ZZ3");
}

#[tokio::test]
async fn test_delete_rows_highest_first() {
    let (transport, adapter) = setup(people());

    let result = adapter.delete(&[2, 4, 2], &[], None).await.unwrap();
    assert_eq!(result.rows, 2);
    assert_eq!(result.columns, 0);

    let (method, params) = transport.calls().pop().unwrap();
    assert_eq!(method, Method::BatchUpdate);
    let requests = params["resource"]["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["deleteDimension"]["range"]["startIndex"], 3);
    assert_eq!(requests[1]["deleteDimension"]["range"]["startIndex"], 1);

    assert_eq!(transport.rows(0), vec![vec!["name", "age"], vec!["bob", "25"]]);
    assert!(!adapter.is_cached());
}

#[tokio::test]
async fn test_delete_columns() {
    let (transport, adapter) = setup(people());

    let result = adapter.delete(&[], &[1], None).await.unwrap();
    assert_eq!(result.columns, 1);
    assert_eq!(transport.rows(0)[0], vec!["age"]);
}

#[tokio::test]
async fn test_delete_nothing_sends_nothing() {
    let (transport, adapter) = setup(people());

    let result = adapter.delete(&[], &[], None).await.unwrap();
    assert_eq!(result.rows + result.columns, 0);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_expand_zero_is_noop() {
    let (transport, adapter) = setup(people());

    adapter.expand(0, 0, 0).await.unwrap();
    assert!(transport.calls().is_empty());

    adapter.expand(0, 5, 1).await.unwrap();
    assert_eq!(transport.dimensions(0), Some((1005, 27)));
}

#[tokio::test]
async fn test_add_and_delete_sheet() {
    let (transport, adapter) = setup(people());

    let added = adapter.add_sheet("Archive").await.unwrap();
    assert_eq!(added.title, "Archive");
    assert_eq!(added.index, 1);

    let resolved = adapter.get_sheet(Some(&"Archive".into())).await.unwrap();
    assert_eq!(resolved.sheet_id, added.sheet_id);

    adapter
        .delete_sheet(&SheetSelector::Id(added.sheet_id))
        .await
        .unwrap();
    assert!(transport.dimensions(added.sheet_id).is_none());

    let err = adapter.delete_sheet(&"Archive".into()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_write_failures_propagate() {
    let (transport, adapter) = setup(people());
    adapter.load().await.unwrap();
    transport.fail_next(1);

    let err = adapter
        .append(&[RowData::values(["x"])], None)
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_metadata() {
    let (_, adapter) = setup(people());

    let metadata = adapter.metadata().await.unwrap();
    assert_eq!(metadata.id, SPREADSHEET);
    assert!(metadata.modified_time.is_some());
}
