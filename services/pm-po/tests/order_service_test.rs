use std::collections::BTreeSet;
use std::sync::Arc;

use pm_po::application::{
    CreatePurchaseOrderCommand, LineItemInput, ListPurchaseOrdersQuery, PurchaseOrderService,
    SupplierInput, UpdatePurchaseOrderCommand,
};
use pm_po::error::OrderError;
use pm_po::infrastructure::persistence::InMemoryStore;
use procure_domain_core::Money;

fn supplier(i: usize) -> SupplierInput {
    SupplierInput {
        id: None,
        name: Some(format!("Supplier {i}")),
        email: Some(format!("supplier{i}@email.com")),
    }
}

fn line_item(name: &str, quantity: i64, price_cents: i64, tax_cents: i64) -> LineItemInput {
    LineItemInput {
        id: None,
        item_name: Some(name.to_string()),
        quantity: Some(quantity),
        price_without_tax: Some(Money::from_cents(price_cents)),
        tax_name: Some("GST 5%".to_string()),
        tax_amount: Some(Money::from_cents(tax_cents)),
    }
}

fn service(store: &InMemoryStore) -> Arc<PurchaseOrderService> {
    Arc::new(PurchaseOrderService::new(Arc::new(store.clone())))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_distinct_order_numbers() {
    let store = InMemoryStore::new();
    let service = service(&store);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create(CreatePurchaseOrderCommand {
                        supplier: supplier(i),
                        line_items: vec![line_item("Widget", 1, 100, 5)],
                    })
                    .await
            })
        })
        .collect();

    let mut numbers = BTreeSet::new();
    for handle in handles {
        let order = handle.await.unwrap().unwrap();
        assert!(numbers.insert(order.order_number.0));
    }

    assert_eq!(numbers, (1..=20).collect::<BTreeSet<_>>());
    assert_eq!(store.order_count().await, 20);
}

#[tokio::test]
async fn failed_update_leaves_no_partial_writes() {
    let store = InMemoryStore::new();
    let service = service(&store);

    let order = service
        .create(CreatePurchaseOrderCommand {
            supplier: supplier(1),
            line_items: vec![line_item("Widget", 1, 1000, 50)],
        })
        .await
        .unwrap();

    // 供应商 id 不存在：此前新建的订单行不能留下
    let err = service
        .update(
            order.id,
            UpdatePurchaseOrderCommand {
                supplier: SupplierInput {
                    id: Some(999),
                    ..SupplierInput::default()
                },
                line_items: vec![line_item("Gadget", 2, 500, 25)],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::SupplierNotFound(_)));

    let reloaded = service.get(order.id).await.unwrap();
    assert_eq!(reloaded, order);
    assert_eq!(store.line_item_count().await, 1);
}

#[tokio::test]
async fn duplicate_line_item_ids_are_rejected() {
    let store = InMemoryStore::new();
    let service = service(&store);

    let order = service
        .create(CreatePurchaseOrderCommand {
            supplier: supplier(1),
            line_items: vec![line_item("Widget", 1, 1000, 50)],
        })
        .await
        .unwrap();
    let existing = order.line_items[0].id.0;

    let repeated = LineItemInput {
        id: Some(existing),
        quantity: Some(3),
        ..LineItemInput::default()
    };
    let err = service
        .update(
            order.id,
            UpdatePurchaseOrderCommand {
                supplier: SupplierInput {
                    id: Some(order.supplier.id.0),
                    ..SupplierInput::default()
                },
                line_items: vec![repeated.clone(), repeated],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::DuplicateLineItem(_)));
    assert_eq!(service.get(order.id).await.unwrap(), order);
}

#[tokio::test]
async fn totals_match_line_items() {
    let store = InMemoryStore::new();
    let service = service(&store);

    let order = service
        .create(CreatePurchaseOrderCommand {
            supplier: supplier(1),
            line_items: vec![
                line_item("A", 3, 1999, 100),
                line_item("B", 1, 1, 0),
                line_item("C", 7, 250, 13),
            ],
        })
        .await
        .unwrap();

    let totals = order.totals();
    let expected: Money = order.line_items.iter().map(|item| item.line_total()).sum();
    let tax: Money = order.line_items.iter().map(|item| item.tax_amount).sum();

    assert_eq!(totals.total_amount, expected);
    assert_eq!(totals.total_tax, tax);
    assert_eq!(totals.total_quantity, 11);
    // (19.99 + 1.00) * 3 + 0.01 + (2.50 + 0.13) * 7
    assert_eq!(totals.total_amount.to_string(), "81.39");
}

#[tokio::test]
async fn list_is_ordered_by_id() {
    let store = InMemoryStore::new();
    let service = service(&store);

    for i in 0..3 {
        service
            .create(CreatePurchaseOrderCommand {
                supplier: supplier(i),
                line_items: vec![line_item("Widget", 1, 100, 5)],
            })
            .await
            .unwrap();
    }

    let orders = service
        .list(ListPurchaseOrdersQuery::default())
        .await
        .unwrap();
    let ids: Vec<_> = orders.iter().map(|order| order.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 3);
}
