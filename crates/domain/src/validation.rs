//! Declarative field rules for order requests.
//!
//! Each rule pairs a field identifier with a predicate. Rules run in table
//! order and every failing rule contributes its identifier to the violation
//! list, so callers see all problems at once.

use common::{Money, NewOrder, NewOrderItem, OrderStatus, ProductId, UserId};

use crate::commands::{CreateOrder, OrderItemRequest, UpdateOrderStatus};
use crate::error::{DomainError, Result};

/// A named predicate over a request.
pub struct Rule<T> {
    pub field: &'static str,
    pub check: fn(&T) -> bool,
}

const ORDER_RULES: &[Rule<CreateOrder>] = &[
    Rule { field: "user_id", check: user_id_is_positive },
    Rule { field: "status", check: order_status_is_known },
    Rule { field: "order_items", check: has_items },
    Rule { field: "total_amount", check: total_is_representable },
];

const ITEM_RULES: &[Rule<OrderItemRequest>] = &[
    Rule { field: "product_id", check: product_id_is_positive },
    Rule { field: "quantity", check: quantity_in_range },
    Rule { field: "unit_price", check: unit_price_is_priceable },
];

const UPDATE_RULES: &[Rule<UpdateOrderStatus>] = &[Rule {
    field: "status",
    check: update_status_is_known,
}];

fn user_id_is_positive(order: &CreateOrder) -> bool {
    is_positive_id(order.user_id)
}

fn order_status_is_known(order: &CreateOrder) -> bool {
    is_known_status(order.status.as_deref())
}

fn has_items(order: &CreateOrder) -> bool {
    order.order_items.as_ref().is_some_and(|items| !items.is_empty())
}

// Items with missing or invalid amounts are reported by their own rules.
fn total_is_representable(order: &CreateOrder) -> bool {
    order
        .order_items
        .iter()
        .flatten()
        .filter_map(|item| {
            let quantity = item.quantity.and_then(|q| u32::try_from(q).ok())?;
            let price = item.unit_price?;
            Some(Money::new(price).checked_multiply(quantity))
        })
        .collect::<Option<Vec<_>>>()
        .and_then(Money::checked_sum)
        .is_some()
}

fn product_id_is_positive(item: &OrderItemRequest) -> bool {
    is_positive_id(item.product_id)
}

// Quantities are stored in a 32-bit signed column.
fn quantity_in_range(item: &OrderItemRequest) -> bool {
    item.quantity
        .is_some_and(|q| (1..=i64::from(i32::MAX)).contains(&q))
}

// Same floor as the store's check constraint.
fn unit_price_is_priceable(item: &OrderItemRequest) -> bool {
    item.unit_price
        .is_some_and(|price| Money::new(price) >= Money::MIN_UNIT_PRICE)
}

fn update_status_is_known(update: &UpdateOrderStatus) -> bool {
    is_known_status(update.status.as_deref())
}

fn is_positive_id(id: Option<i64>) -> bool {
    id.is_some_and(|id| id >= 1)
}

fn is_known_status(status: Option<&str>) -> bool {
    status.is_some_and(|s| s.parse::<OrderStatus>().is_ok())
}

fn apply<T>(rules: &[Rule<T>], value: &T, prefix: &str, violations: &mut Vec<String>) {
    for rule in rules {
        if !(rule.check)(value) {
            violations.push(format!("{prefix}{}", rule.field));
        }
    }
}

/// Returns the field identifiers a create request violates, in rule order.
pub fn create_violations(request: &CreateOrder) -> Vec<String> {
    let mut violations = Vec::new();
    apply(ORDER_RULES, request, "", &mut violations);

    for (index, item) in request.order_items.iter().flatten().enumerate() {
        apply(ITEM_RULES, item, &format!("order_items[{index}]."), &mut violations);
    }

    violations
}

/// Validates a create request and converts it into an order ready to persist.
///
/// The total is derived from every item.
pub fn validate_create(request: &CreateOrder) -> Result<NewOrder> {
    let violations = create_violations(request);
    if !violations.is_empty() {
        return Err(DomainError::Validation(violations));
    }

    let user_id = request.user_id.map(UserId::new).ok_or_else(|| violation("user_id"))?;
    let status = parse_status(request.status.as_deref())?;
    let items = request
        .order_items
        .iter()
        .flatten()
        .enumerate()
        .map(|(index, item)| to_new_item(index, item))
        .collect::<Result<Vec<_>>>()?;

    NewOrder::new(user_id, status, items).ok_or_else(|| violation("total_amount"))
}

/// Validates a status update and returns the requested status.
pub fn validate_update(request: &UpdateOrderStatus) -> Result<OrderStatus> {
    let mut violations = Vec::new();
    apply(UPDATE_RULES, request, "", &mut violations);
    if !violations.is_empty() {
        return Err(DomainError::Validation(violations));
    }

    parse_status(request.status.as_deref())
}

fn parse_status(status: Option<&str>) -> Result<OrderStatus> {
    status
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| violation("status"))
}

fn to_new_item(index: usize, item: &OrderItemRequest) -> Result<NewOrderItem> {
    let field = |name: &str| violation(&format!("order_items[{index}].{name}"));

    let product_id = item
        .product_id
        .map(ProductId::new)
        .ok_or_else(|| field("product_id"))?;
    let quantity = item
        .quantity
        .and_then(|q| u32::try_from(q).ok())
        .ok_or_else(|| field("quantity"))?;
    let unit_price = item.unit_price.map(Money::new).ok_or_else(|| field("unit_price"))?;

    Ok(NewOrderItem::new(product_id, quantity, unit_price))
}

fn violation(field: &str) -> DomainError {
    DomainError::Validation(vec![field.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid() -> CreateOrder {
        CreateOrder::new(
            1,
            "NEW",
            vec![
                OrderItemRequest::new(7, 2, dec!(9.99)),
                OrderItemRequest::new(8, 1, dec!(5.00)),
            ],
        )
    }

    fn violations(request: &CreateOrder) -> Vec<String> {
        match validate_create(request) {
            Err(DomainError::Validation(v)) => v,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn valid_request_converts_with_full_total() {
        let order = validate_create(&valid()).unwrap();
        assert_eq!(order.user_id, UserId::new(1));
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.order_items.len(), 2);
        assert_eq!(order.total_amount.amount(), dec!(24.98));
    }

    #[test]
    fn zero_user_id_is_rejected() {
        let mut request = valid();
        request.user_id = Some(0);
        assert_eq!(violations(&request), vec!["user_id"]);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut request = valid();
        request.status = Some("UNKNOWN".to_string());
        assert_eq!(violations(&request), vec!["status"]);
    }

    #[test]
    fn empty_items_are_rejected() {
        let mut request = valid();
        request.order_items = Some(vec![]);
        assert_eq!(violations(&request), vec!["order_items"]);
    }

    #[test]
    fn zero_quantity_names_the_item() {
        let mut request = valid();
        request.order_items = Some(vec![
            OrderItemRequest::new(7, 2, dec!(9.99)),
            OrderItemRequest::new(8, 0, dec!(5.00)),
        ]);
        assert_eq!(violations(&request), vec!["order_items[1].quantity"]);
    }

    #[test]
    fn zero_unit_price_is_rejected() {
        let mut request = valid();
        request.order_items = Some(vec![OrderItemRequest::new(7, 1, dec!(0))]);
        assert_eq!(violations(&request), vec!["order_items[0].unit_price"]);
    }

    #[test]
    fn price_below_minimum_unit_is_rejected() {
        let mut request = valid();
        request.order_items = Some(vec![OrderItemRequest::new(7, 1, dec!(0.05))]);
        assert_eq!(violations(&request), vec!["order_items[0].unit_price"]);
    }

    #[test]
    fn quantity_is_bounded_by_the_integer_column() {
        let mut request = valid();
        request.order_items = Some(vec![OrderItemRequest::new(7, i64::from(i32::MAX), dec!(1))]);
        assert!(validate_create(&request).is_ok());

        request.order_items = Some(vec![OrderItemRequest::new(
            7,
            i64::from(i32::MAX) + 1,
            dec!(1),
        )]);
        assert_eq!(violations(&request), vec!["order_items[0].quantity"]);
    }

    #[test]
    fn overflowing_line_total_is_a_violation() {
        let mut request = valid();
        request.order_items = Some(vec![OrderItemRequest::new(
            7,
            2_000_000_000,
            dec!(50000000000000000000000000),
        )]);
        assert_eq!(violations(&request), vec!["total_amount"]);
    }

    #[test]
    fn overflowing_order_total_is_a_violation() {
        let mut request = valid();
        let line = OrderItemRequest::new(7, 1, dec!(30000000000000000000000000000));
        request.order_items = Some(vec![line.clone(), line.clone(), line]);
        assert_eq!(violations(&request), vec!["total_amount"]);
    }

    #[test]
    fn empty_body_reports_every_required_field() {
        assert_eq!(
            violations(&CreateOrder::default()),
            vec!["user_id", "status", "order_items"]
        );
    }

    #[test]
    fn all_violations_are_collected_in_order() {
        let request = CreateOrder {
            user_id: Some(-4),
            status: Some("new".to_string()),
            order_items: Some(vec![OrderItemRequest {
                product_id: None,
                quantity: Some(-1),
                unit_price: Some(dec!(1)),
            }]),
        };
        assert_eq!(
            violations(&request),
            vec![
                "user_id",
                "status",
                "order_items[0].product_id",
                "order_items[0].quantity"
            ]
        );
    }

    #[test]
    fn update_requires_a_known_status() {
        assert_eq!(
            validate_update(&UpdateOrderStatus::new("SHIPPED")).unwrap(),
            OrderStatus::Shipped
        );
        assert!(matches!(
            validate_update(&UpdateOrderStatus::default()),
            Err(DomainError::Validation(v)) if v == vec!["status"]
        ));
        assert!(matches!(
            validate_update(&UpdateOrderStatus::new("")),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn request_parses_from_json_with_missing_fields() {
        let request: CreateOrder =
            serde_json::from_str(r#"{"user_id": 3, "order_items": [{"quantity": 2}]}"#).unwrap();
        assert_eq!(request.user_id, Some(3));
        assert!(request.status.is_none());
        assert_eq!(
            violations(&request),
            vec![
                "status",
                "order_items[0].product_id",
                "order_items[0].unit_price"
            ]
        );
    }
}
