use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PromoCodes {
    Table,
    Id,
    Code,
    Description,
    DiscountType,
    DiscountValue,
    MinAmount,
    MaxUses,
    UsedCount,
    EventId,
    ValidFrom,
    ValidUntil,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Events {
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
                    .table(PromoCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromoCodes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PromoCodes::Code).string_len(50).not_null())
                    .col(ColumnDef::new(PromoCodes::Description).string_len(255).null())
                    // percentage | fixed
                    .col(
                        ColumnDef::new(PromoCodes::DiscountType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::DiscountValue)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::MinAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    // NULL = 不限次数
                    .col(ColumnDef::new(PromoCodes::MaxUses).integer().null())
                    .col(
                        ColumnDef::new(PromoCodes::UsedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    // NULL = 通用优惠码
                    .col(ColumnDef::new(PromoCodes::EventId).integer().null())
                    .col(
                        ColumnDef::new(PromoCodes::ValidFrom)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::ValidUntil)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promo_codes_event")
                            .from(PromoCodes::Table, PromoCodes::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promo_codes_code_unique")
                    .table(PromoCodes::Table)
                    .col(PromoCodes::Code)
                    .unique()
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
                    .table(PromoCodes::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
