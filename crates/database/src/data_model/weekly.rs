use async_trait::async_trait;
use chrono::NaiveDate;
use demurrage::database::{Result, WeeklyDemurrageRepo};
use model::{
    company::Company,
    demurrage::{Week, WeeklyDemurrage},
    tracking::InvoiceFlags,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::queries::weekly::{for_company, get, lock, put_totals, set_flags};
use crate::PgDatabaseAutocommit;
use crate::PgDatabaseTransaction;

/// Keyed by company and week, so there is no `DatabaseRow` impl.
#[derive(Debug, Clone, FromRow)]
pub struct WeeklyDemurrageRow {
    pub company_id: i32,
    pub week_start: NaiveDate,
    pub total_minutes: i64,
    pub event_count: i32,
    pub invoice_generated: bool,
    pub invoice_sent: bool,
}

impl WeeklyDemurrageRow {
    pub fn to_model(self) -> WeeklyDemurrage {
        WeeklyDemurrage {
            company_id: Id::new(self.company_id),
            week_start: Week::containing(self.week_start),
            total_minutes: self.total_minutes,
            event_count: self.event_count,
            invoice_generated: self.invoice_generated,
            invoice_sent: self.invoice_sent,
        }
    }
}

#[async_trait]
impl WeeklyDemurrageRepo for PgDatabaseAutocommit {
    async fn get_weekly(
        &mut self,
        company_id: &Id<Company>,
        week: Week,
    ) -> Result<Option<WeeklyDemurrage>> {
        get(&self.pool, company_id, week).await
    }

    async fn lock_week(&mut self, company_id: &Id<Company>, week: Week) -> Result<()> {
        lock(&self.pool, company_id, week).await
    }

    async fn put_weekly_totals(&mut self, weekly: &WeeklyDemurrage) -> Result<WeeklyDemurrage> {
        put_totals(&self.pool, weekly).await
    }

    async fn set_invoice_flags(
        &mut self,
        company_id: &Id<Company>,
        week: Week,
        flags: &InvoiceFlags,
    ) -> Result<WeeklyDemurrage> {
        set_flags(&self.pool, company_id, week, flags).await
    }

    async fn weekly_for_company(
        &mut self,
        company_id: &Id<Company>,
    ) -> Result<Vec<WeeklyDemurrage>> {
        for_company(&self.pool, company_id).await
    }
}

#[async_trait]
impl<'a> WeeklyDemurrageRepo for PgDatabaseTransaction<'a> {
    async fn get_weekly(
        &mut self,
        company_id: &Id<Company>,
        week: Week,
    ) -> Result<Option<WeeklyDemurrage>> {
        get(&mut *self.tx, company_id, week).await
    }

    async fn lock_week(&mut self, company_id: &Id<Company>, week: Week) -> Result<()> {
        lock(&mut *self.tx, company_id, week).await
    }

    async fn put_weekly_totals(&mut self, weekly: &WeeklyDemurrage) -> Result<WeeklyDemurrage> {
        put_totals(&mut *self.tx, weekly).await
    }

    async fn set_invoice_flags(
        &mut self,
        company_id: &Id<Company>,
        week: Week,
        flags: &InvoiceFlags,
    ) -> Result<WeeklyDemurrage> {
        set_flags(&mut *self.tx, company_id, week, flags).await
    }

    async fn weekly_for_company(
        &mut self,
        company_id: &Id<Company>,
    ) -> Result<Vec<WeeklyDemurrage>> {
        for_company(&mut *self.tx, company_id).await
    }
}
