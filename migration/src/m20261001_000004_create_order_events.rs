use sea_orm_migration::prelude::*;

/// 订单事件 outbox：与状态变更同事务写入，由后台任务投递
#[derive(DeriveIden)]
enum OrderEvents {
    Table,
    Id,
    OrderId,
    OrderNo,
    Kind,
    Payload,
    Attempts,
    LastError,
    DeliveredAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderEvents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderEvents::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderEvents::OrderNo).string_len(50).not_null())
                    .col(ColumnDef::new(OrderEvents::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(OrderEvents::Payload).text().not_null())
                    .col(
                        ColumnDef::new(OrderEvents::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrderEvents::LastError).text().null())
                    .col(
                        ColumnDef::new(OrderEvents::DeliveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(OrderEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_events_order")
                            .from(OrderEvents::Table, OrderEvents::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_events_pending")
                    .table(OrderEvents::Table)
                    .col(OrderEvents::DeliveredAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(OrderEvents::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
