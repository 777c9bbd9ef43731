//! Stream and consumer naming for the two startup consumers.

/// Where a consumer reads from.
///
/// A binding names the JetStream stream, the subject the consumer filters on,
/// and the durable consumer name shared by every replica of the service.
pub trait ConsumerBinding: Send + Sync + 'static {
    /// Stream name used in NATS JetStream.
    const STREAM: &'static str;

    /// Subject captured by the stream and filtered by the consumer.
    const SUBJECT: &'static str;

    /// Durable consumer name.
    const DURABLE: &'static str;

    /// Human readable description attached to the stream and consumer.
    const DESCRIPTION: &'static str;
}

/// Gig update events published by other services (ratings, counters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GigUpdateBinding;

impl ConsumerBinding for GigUpdateBinding {
    const DESCRIPTION: &'static str = "Gig update events";
    const DURABLE: &'static str = "gig-update-queue";
    const STREAM: &'static str = "JOBBER_UPDATE_GIG";
    const SUBJECT: &'static str = "jobber-update-gig.update-gig";
}

/// Seed requests carrying seller data used to bootstrap gig documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeedBinding;

impl ConsumerBinding for SeedBinding {
    const DESCRIPTION: &'static str = "Gig seed requests";
    const DURABLE: &'static str = "gig-queue";
    const STREAM: &'static str = "JOBBER_GIG";
    const SUBJECT: &'static str = "jobber-gig.get-sellers";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gig_update_binding() {
        assert_eq!(GigUpdateBinding::STREAM, "JOBBER_UPDATE_GIG");
        assert_eq!(GigUpdateBinding::SUBJECT, "jobber-update-gig.update-gig");
        assert_eq!(GigUpdateBinding::DURABLE, "gig-update-queue");
    }

    #[test]
    fn seed_binding() {
        assert_eq!(SeedBinding::STREAM, "JOBBER_GIG");
        assert_eq!(SeedBinding::SUBJECT, "jobber-gig.get-sellers");
        assert_eq!(SeedBinding::DURABLE, "gig-queue");
    }

    #[test]
    fn subjects_are_scoped_by_stream() {
        assert!(GigUpdateBinding::SUBJECT.starts_with("jobber-update-gig."));
        assert!(SeedBinding::SUBJECT.starts_with("jobber-gig."));
    }
}
