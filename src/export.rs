//! Order exports: CSV download and the printable delivery slip.

use crate::models::{Order, OrderItem};

const CSV_HEADER: &str = "Order Number,Order Date,Customer Name,Email,Phone,Address,Landmark,\
                          Items,Subtotal,Delivery Charge,Total Amount,Payment Method,Status";

/// Renders orders as CSV, one row per order with items folded into a single
/// cell. The delivery charge is reconstructed as `total - subtotal`, which
/// holds because totals are never recomputed after creation.
pub fn orders_to_csv(orders: &[(Order, Vec<OrderItem>)]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for (order, items) in orders {
        let address = &order.shipping_address.0;
        let subtotal: i64 = items.iter().map(|i| i.unit_price * i.quantity).sum();
        let delivery_charge = order.total_amount - subtotal;
        let items_cell = items
            .iter()
            .map(|i| format!("{} (Qty: {})", i.product_name, i.quantity))
            .collect::<Vec<_>>()
            .join("; ");
        let customer = format!("{} {}", address.first_name, address.last_name)
            .trim()
            .to_string();
        let street_address = format!(
            "{}, {}, {} {}",
            address.street.as_deref().unwrap_or(""),
            address.city.as_deref().unwrap_or(""),
            address.state.as_deref().unwrap_or(""),
            address.zip_code.as_deref().unwrap_or(""),
        );

        let fields = [
            order.order_number.clone(),
            order.created_at.format("%Y-%m-%d").to_string(),
            customer,
            address.email.clone().unwrap_or_else(|| "N/A".into()),
            address.phone.clone().unwrap_or_else(|| "N/A".into()),
            street_address,
            address
                .nearest_landmark
                .clone()
                .unwrap_or_else(|| "N/A".into()),
            items_cell,
            subtotal.to_string(),
            delivery_charge.to_string(),
            order.total_amount.to_string(),
            order.payment_method.clone(),
            order.status.clone(),
        ];
        let row = fields
            .iter()
            .map(|f| csv_escape(f))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }

    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A compact printable A4 delivery slip.
pub fn render_delivery_slip(order: &Order, items: &[OrderItem], store_name: &str) -> String {
    let address = &order.shipping_address.0;
    let subtotal: i64 = items.iter().map(|i| i.unit_price * i.quantity).sum();
    let delivery_charge = order.total_amount - subtotal;

    let item_rows = items
        .iter()
        .map(|i| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                html_escape(&i.product_name),
                i.quantity,
                i.unit_price,
                i.unit_price * i.quantity,
            )
        })
        .collect::<String>();

    let landmark = address
        .nearest_landmark
        .as_deref()
        .map(|l| format!("<p><strong>Landmark:</strong> {}</p>", html_escape(l)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Delivery Slip - {order_number}</title>
<style>
  @page {{ size: A4; margin: 0.5cm; }}
  body {{ font-family: Arial, sans-serif; font-size: 11px; color: #000; padding: 15px; }}
  .slip {{ border: 2px solid #000; padding: 15px; }}
  .header {{ text-align: center; border-bottom: 2px solid #000; padding-bottom: 10px; margin-bottom: 15px; }}
  .info {{ display: grid; grid-template-columns: 1fr 1fr; gap: 15px; margin-bottom: 15px; }}
  .info div {{ border: 1px solid #000; padding: 10px; }}
  table {{ width: 100%; border-collapse: collapse; }}
  th, td {{ border: 1px solid #000; padding: 6px; font-size: 10px; text-align: left; }}
  th {{ background: #000; color: #fff; }}
  .totals {{ text-align: right; margin-top: 10px; }}
  .totals .final {{ font-size: 14px; font-weight: bold; }}
</style>
</head>
<body>
<div class="slip">
  <div class="header"><h1>{store}</h1><p>Delivery Slip</p></div>
  <div class="info">
    <div>
      <h3>Order Information</h3>
      <p><strong>Order Number:</strong> {order_number}</p>
      <p><strong>Order Date:</strong> {order_date}</p>
      <p><strong>Payment:</strong> {payment_method}</p>
    </div>
    <div>
      <h3>Delivery Address</h3>
      <p><strong>{first_name} {last_name}</strong></p>
      <p>{street}</p>
      <p>{city}, {state} {zip}</p>
      <p><strong>Phone:</strong> {phone}</p>
      {landmark}
    </div>
  </div>
  <table>
    <tr><th>Item</th><th>Qty</th><th>Unit Price</th><th>Total</th></tr>
    {item_rows}
  </table>
  <div class="totals">
    <p>Subtotal: {subtotal}</p>
    <p>Delivery Charge: {delivery_charge}</p>
    <p class="final">Total: {total}</p>
  </div>
</div>
</body>
</html>"#,
        store = html_escape(store_name),
        order_number = html_escape(&order.order_number),
        order_date = order.created_at.format("%Y-%m-%d"),
        payment_method = html_escape(&order.payment_method),
        first_name = html_escape(&address.first_name),
        last_name = html_escape(&address.last_name),
        street = html_escape(address.street.as_deref().unwrap_or("")),
        city = html_escape(address.city.as_deref().unwrap_or("")),
        state = html_escape(address.state.as_deref().unwrap_or("")),
        zip = html_escape(address.zip_code.as_deref().unwrap_or("")),
        phone = html_escape(address.phone.as_deref().unwrap_or("N/A")),
        landmark = landmark,
        item_rows = item_rows,
        subtotal = subtotal,
        delivery_charge = delivery_charge,
        total = order.total_amount,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShippingAddress;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn sample_order() -> (Order, Vec<OrderItem>) {
        let order_id = Uuid::new_v4();
        let order = Order {
            id: order_id,
            order_number: "A1B2C3".into(),
            user_id: None,
            shipping_address: Json(ShippingAddress {
                first_name: "Ada".into(),
                last_name: "Khan".into(),
                email: Some("ada@example.com".into()),
                phone: Some("0300-1234567".into()),
                street: Some("12 Canal Road, Block B".into()),
                city: Some("Lahore".into()),
                state: Some("Punjab".into()),
                zip_code: Some("54000".into()),
                country: Some("Pakistan".into()),
                nearest_landmark: None,
            }),
            total_amount: 500,
            status: "pending".into(),
            payment_method: "COD".into(),
            payment_status: "pending".into(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let items = vec![OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            product_name: "Noir Essence".into(),
            quantity: 3,
            unit_price: 100,
            position: 0,
        }];
        (order, items)
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_csv_reconstructs_delivery_charge() {
        let (order, items) = sample_order();
        let csv = orders_to_csv(&[(order, items)]);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Order Number,"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("A1B2C3,"));
        // subtotal 300, delivery 200, total 500
        assert!(row.contains(",300,200,500,"));
        // Comma inside the address field forces quoting.
        assert!(row.contains("\"12 Canal Road, Block B, Lahore, Punjab 54000\""));
    }

    #[test]
    fn test_delivery_slip_contents() {
        let (order, items) = sample_order();
        let html = render_delivery_slip(&order, &items, "Mistiq Perfumeries");
        assert!(html.contains("A1B2C3"));
        assert!(html.contains("Noir Essence"));
        assert!(html.contains("Delivery Charge: 200"));
        assert!(html.contains("Total: 500"));
    }

    #[test]
    fn test_slip_escapes_markup() {
        let (mut order, items) = sample_order();
        order.shipping_address.0.first_name = "<script>".into();
        let html = render_delivery_slip(&order, &items, "Store");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
