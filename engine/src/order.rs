//! Checkout assembly and the orders read model.

use crate::{
    document::OrderDoc, error::Result, CheckoutLine, Error, Order, OrderItem, OrderItemView,
    OrderLine, OrderView, ProductId, Timestamp, ORDER_STATUS_PROCESSING,
};

/// An order ready to be written: header, lines, and the cart rows it consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl NewOrder {
    /// Assemble an order from checkout lines.
    ///
    /// `next_id` is called once for the order and once per line, in that
    /// order. Each line keeps the total price it was checked out with.
    pub fn assemble(
        lines: &[CheckoutLine],
        order_time: Timestamp,
        mut next_id: impl FnMut() -> String,
    ) -> Result<Self> {
        if lines.is_empty() {
            return Err(Error::EmptyOrder);
        }
        if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
            return Err(Error::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }

        let order = Order {
            id: next_id(),
            order_time,
            status: ORDER_STATUS_PROCESSING.to_string(),
        };
        let items = lines
            .iter()
            .map(|line| OrderItem {
                id: next_id(),
                quantity: line.quantity,
                product_id: line.product_id,
                order_id: order.id.clone(),
                total_price: line.items_total_price,
            })
            .collect();

        Ok(Self { order, items })
    }

    /// Products whose cart rows this order empties.
    pub fn cart_product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|item| item.product_id).collect()
    }

    pub fn to_document(&self) -> OrderDoc {
        OrderDoc::from_rows(&self.order, &self.items)
    }
}

/// Group flattened order rows into orders.
///
/// Orders appear in the order their first row appears, so rows sorted
/// newest-first yield orders newest-first.
pub fn group_order_lines(lines: Vec<OrderLine>) -> Vec<OrderView> {
    let mut orders: Vec<OrderView> = Vec::new();
    for line in lines {
        let item = OrderItemView {
            order_id: line.order_id.clone(),
            product_id: line.product_id,
            quantity: line.quantity,
            total_price: line.total_price,
            title: line.title,
            description: line.description,
            thumbnail: line.thumbnail,
        };
        match orders.iter_mut().find(|o| o.id == line.order_id) {
            Some(order) => order.items.push(item),
            None => orders.push(OrderView {
                id: line.order_id,
                order_time: line.order_time,
                status: line.order_status,
                items: vec![item],
            }),
        }
    }
    orders
}
