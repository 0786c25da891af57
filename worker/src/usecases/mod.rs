pub mod expire_overdue_payments;
