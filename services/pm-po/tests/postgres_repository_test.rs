//! PostgreSQL 集成测试，需要 `DATABASE_URL`：
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/procure_test cargo test -p pm-po -- --ignored
//! ```

use std::sync::Arc;

use pm_po::application::{
    CreatePurchaseOrderCommand, LineItemInput, ListPurchaseOrdersQuery, PurchaseOrderService,
    SupplierInput, UpdatePurchaseOrderCommand,
};
use pm_po::domain::{PurchaseOrder, PurchaseOrderId};
use pm_po::error::OrderError;
use pm_po::infrastructure::persistence::PostgresUnitOfWorkFactory;
use procure_domain_core::Money;
use sqlx::PgPool;

fn service(pool: PgPool) -> Arc<PurchaseOrderService> {
    Arc::new(PurchaseOrderService::new(Arc::new(
        PostgresUnitOfWorkFactory::new(pool),
    )))
}

fn line_item(name: &str) -> LineItemInput {
    LineItemInput {
        id: None,
        item_name: Some(name.to_string()),
        quantity: Some(2),
        price_without_tax: Some(Money::from_cents(1500)),
        tax_name: Some("GST 5%".to_string()),
        tax_amount: Some(Money::from_cents(75)),
    }
}

fn keep(order: &PurchaseOrder) -> LineItemInput {
    LineItemInput {
        id: Some(order.line_items[0].id.0),
        ..LineItemInput::default()
    }
}

fn replace_with(order: &PurchaseOrder, extra: &str) -> UpdatePurchaseOrderCommand {
    UpdatePurchaseOrderCommand {
        supplier: SupplierInput {
            id: Some(order.supplier.id.0),
            ..SupplierInput::default()
        },
        line_items: vec![keep(order), line_item(extra)],
    }
}

async fn line_item_count(pool: &PgPool, order_id: PurchaseOrderId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM line_items WHERE purchase_order_id = $1")
        .bind(order_id.0)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn create(i: usize, item: &str) -> CreatePurchaseOrderCommand {
    CreatePurchaseOrderCommand {
        supplier: SupplierInput {
            id: None,
            name: Some(format!("Supplier_{i}")),
            email: Some(format!("supplier{i}@email.com")),
        },
        line_items: vec![line_item(item)],
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn create_get_update_delete(pool: PgPool) {
    let service = service(pool);

    let order = service.create(create(1, "Test Product")).await.unwrap();
    assert_eq!(order.order_number.0, 1);
    assert_eq!(order.totals().total_amount.to_string(), "31.50");

    let fetched = service.get(order.id).await.unwrap();
    assert_eq!(fetched, order);

    let updated = service
        .update(
            order.id,
            UpdatePurchaseOrderCommand {
                supplier: SupplierInput {
                    id: Some(order.supplier.id.0),
                    name: Some("Renamed".to_string()),
                    email: None,
                },
                line_items: vec![
                    LineItemInput {
                        id: Some(order.line_items[0].id.0),
                        quantity: Some(1),
                        ..LineItemInput::default()
                    },
                    line_item("Second Product"),
                ],
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.supplier.name, "Renamed");
    assert_eq!(updated.line_items.len(), 2);
    assert_eq!(updated.line_items[0].quantity, 1);
    assert_eq!(updated.order_number, order.order_number);

    service.delete(order.id).await.unwrap();
    assert!(matches!(
        service.get(order.id).await,
        Err(OrderError::PurchaseOrderNotFound(_))
    ));
    assert!(matches!(
        service.delete(order.id).await,
        Err(OrderError::PurchaseOrderNotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_creates_get_distinct_order_numbers(pool: PgPool) {
    let service = service(pool);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.create(create(i, "Widget")).await })
        })
        .collect();

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().order_number.0);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_filters_escape_wildcards(pool: PgPool) {
    let service = service(pool);
    service.create(create(1, "100% Cotton")).await.unwrap();
    service.create(create(2, "Polyester")).await.unwrap();

    let matched = service
        .list(ListPurchaseOrdersQuery {
            supplier_name: None,
            item_name: Some("100%".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(matched.len(), 1);

    // `_` 只匹配字面下划线
    let by_supplier = service
        .list(ListPurchaseOrdersQuery {
            supplier_name: Some("supplier_2".to_string()),
            item_name: None,
        })
        .await
        .unwrap();
    assert_eq!(by_supplier.len(), 1);

    let none = service
        .list(ListPurchaseOrdersQuery {
            supplier_name: Some("%".to_string()),
            item_name: None,
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_updates_of_one_order_replace_line_items(pool: PgPool) {
    let service = service(pool.clone());
    let order = service.create(create(1, "A")).await.unwrap();
    let id = order.id;

    for round in 0..20 {
        let first = {
            let service = service.clone();
            let cmd = replace_with(&order, "B");
            tokio::spawn(async move { service.update(id, cmd).await })
        };
        let second = {
            let service = service.clone();
            let cmd = replace_with(&order, "C");
            tokio::spawn(async move { service.update(id, cmd).await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let current = service.get(order.id).await.unwrap();
        let names: Vec<_> = current
            .line_items
            .iter()
            .map(|item| item.item_name.as_str())
            .collect();
        assert_eq!(current.line_items.len(), 2, "round {round}: {names:?}");
        assert_eq!(current.line_items[0].id, order.line_items[0].id);
        assert!(names == ["A", "B"] || names == ["A", "C"], "round {round}: {names:?}");
        assert_eq!(line_item_count(&pool, order.id).await, 2);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_update_and_delete_leave_no_orphans(pool: PgPool) {
    let service = service(pool.clone());
    let order = service.create(create(1, "A")).await.unwrap();
    let id = order.id;

    let update = {
        let service = service.clone();
        let cmd = replace_with(&order, "B");
        tokio::spawn(async move { service.update(id, cmd).await })
    };
    let delete = {
        let service = service.clone();
        tokio::spawn(async move { service.delete(id).await })
    };

    match update.await.unwrap() {
        Ok(_) | Err(OrderError::PurchaseOrderNotFound(_)) => {}
        Err(e) => panic!("unexpected update error: {e}"),
    }
    delete.await.unwrap().unwrap();

    assert!(matches!(
        service.get(order.id).await,
        Err(OrderError::PurchaseOrderNotFound(_))
    ));
    assert_eq!(line_item_count(&pool, order.id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn foreign_line_item_rolls_back_whole_update(pool: PgPool) {
    let service = service(pool.clone());
    let order = service.create(create(1, "A")).await.unwrap();
    let other = service.create(create(2, "Z")).await.unwrap();

    let err = service
        .update(
            order.id,
            UpdatePurchaseOrderCommand {
                supplier: SupplierInput {
                    id: Some(order.supplier.id.0),
                    name: Some("Should Not Stick".to_string()),
                    email: None,
                },
                line_items: vec![
                    line_item("Inserted Then Rolled Back"),
                    LineItemInput {
                        id: Some(other.line_items[0].id.0),
                        quantity: Some(99),
                        ..LineItemInput::default()
                    },
                ],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::ForeignLineItem(_)));
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.public_message(), "Invalid purchase order data.");

    assert_eq!(service.get(order.id).await.unwrap(), order);
    assert_eq!(service.get(other.id).await.unwrap(), other);
    assert_eq!(line_item_count(&pool, order.id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_supplier_email_on_create_is_rejected(pool: PgPool) {
    let service = service(pool.clone());
    service.create(create(1, "A")).await.unwrap();

    let mut duplicate = create(2, "B");
    duplicate.supplier.email = Some("supplier1@email.com".to_string());
    let err = service.create(duplicate).await.unwrap_err();

    assert!(matches!(err, OrderError::DuplicateSupplierEmail(_)));
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.public_message(), "Invalid supplier data.");

    let suppliers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
        .fetch_one(&pool)
        .await
        .unwrap();
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_orders")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((suppliers, orders), (1, 1));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn delete_removes_line_items(pool: PgPool) {
    let service = service(pool.clone());
    let mut cmd = create(1, "A");
    cmd.line_items.push(line_item("B"));
    let order = service.create(cmd).await.unwrap();
    assert_eq!(line_item_count(&pool, order.id).await, 2);

    service.delete(order.id).await.unwrap();

    assert_eq!(line_item_count(&pool, order.id).await, 0);
    let suppliers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(suppliers, 1);
}
