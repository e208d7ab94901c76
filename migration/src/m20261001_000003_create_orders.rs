use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderNo,
    SubjectType,
    SubjectId,
    Name,
    Email,
    Phone,
    Company,
    JobTitle,
    OriginalAmount,
    DiscountAmount,
    FinalAmount,
    PromoCodeId,
    PromoCode,
    PaymentStatus,
    PaymentMethod,
    GatewayTradeNo,
    PaidAt,
    EffectsAppliedAt,
    AccessGrantedAt,
    NeedInvoice,
    TaxId,
    InvoiceTitle,
    InvoiceEligible,
    Notes,
    CreatedAt,
    UpdatedAt,
}

/// 课程开通记录（付款成功后写入，退款时撤销）
#[derive(DeriveIden)]
enum CourseAccessGrants {
    Table,
    Id,
    OrderId,
    CourseId,
    Email,
    GrantedAt,
    RevokedAt,
}

#[derive(DeriveIden)]
enum PromoCodes {
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
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::OrderNo).string_len(50).not_null())
                    // event | video_course
                    .col(ColumnDef::new(Orders::SubjectType).string_len(16).not_null())
                    .col(ColumnDef::new(Orders::SubjectId).integer().not_null())
                    .col(ColumnDef::new(Orders::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Orders::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Orders::Phone).string_len(20).not_null())
                    .col(ColumnDef::new(Orders::Company).string_len(200).null())
                    .col(ColumnDef::new(Orders::JobTitle).string_len(100).null())
                    .col(
                        ColumnDef::new(Orders::OriginalAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::DiscountAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Orders::FinalAmount).big_integer().not_null())
                    .col(ColumnDef::new(Orders::PromoCodeId).integer().null())
                    // 冗余保存优惠码字符串，优惠码修改或删除后历史订单仍可读
                    .col(ColumnDef::new(Orders::PromoCode).string_len(50).null())
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Orders::PaymentMethod).string_len(50).null())
                    .col(ColumnDef::new(Orders::GatewayTradeNo).string_len(100).null())
                    .col(
                        ColumnDef::new(Orders::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::EffectsAppliedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::AccessGrantedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::NeedInvoice)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Orders::TaxId).string_len(20).null())
                    .col(ColumnDef::new(Orders::InvoiceTitle).string_len(200).null())
                    .col(
                        ColumnDef::new(Orders::InvoiceEligible)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Orders::Notes).text().null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // 不级联删除，优惠码删除后订单保留快照
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_promo_code")
                            .from(Orders::Table, Orders::PromoCodeId)
                            .to(PromoCodes::Table, PromoCodes::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_order_no_unique")
                    .table(Orders::Table)
                    .col(Orders::OrderNo)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_gateway_trade_no")
                    .table(Orders::Table)
                    .col(Orders::GatewayTradeNo)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_email")
                    .table(Orders::Table)
                    .col(Orders::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CourseAccessGrants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CourseAccessGrants::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CourseAccessGrants::OrderId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseAccessGrants::CourseId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseAccessGrants::Email)
                            .string_len(320)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseAccessGrants::GrantedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CourseAccessGrants::RevokedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_access_grants_order")
                            .from(CourseAccessGrants::Table, CourseAccessGrants::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 一个订单最多一条开通记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_course_access_grants_order_unique")
                    .table(CourseAccessGrants::Table)
                    .col(CourseAccessGrants::OrderId)
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
                    .table(CourseAccessGrants::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Orders::Table).to_owned())
            .await?;
        Ok(())
    }
}
