//! The MVCC visibility predicate.

use sable_common::{CommandId, TxId};
use sable_txn::{Snapshot, TransactionManager};

use crate::codec::Record;

/// Decides whether `record` is visible to a reader.
///
/// The rules, applied in order:
///
/// 1. A record created by an aborted transaction is never visible.
/// 2. The reader sees its own writes from *earlier* commands only
///    (`record.cid < reader_cid`), and only while it has not deleted
///    them.
/// 3. A record whose creator is committed in the reader's snapshot is
///    visible unless it was deleted by the reader's own transaction in
///    an earlier command, or by a deleter that both committed and is in
///    the snapshot. Deletions by aborted transactions or by transactions
///    still invisible to this snapshot do not hide it.
/// 4. Everything else (creator active, or committed after the snapshot)
///    is invisible.
///
/// Command ids are not tracked on `xmax`, so rule 3 resolves "deleted by
/// the reader itself" pessimistically: the reader stops seeing a record
/// as soon as it has stamped it, which gives the expected
/// UPDATE-then-SELECT behavior inside one transaction.
pub fn is_visible(
    record: &Record,
    reader_tx: TxId,
    reader_cid: CommandId,
    snapshot: &Snapshot,
    txns: &TransactionManager,
) -> bool {
    if txns.is_aborted(record.xmin) {
        return false;
    }

    if record.xmin == reader_tx {
        if record.cid >= reader_cid {
            // Not yet issued by this command.
            return false;
        }
        return record.xmax == TxId::INVALID;
    }

    if txns.is_committed(record.xmin) && snapshot.sees(record.xmin) {
        if record.xmax == TxId::INVALID {
            return true;
        }
        if record.xmax == reader_tx {
            // The reader deleted it in an earlier command.
            return false;
        }
        if txns.is_aborted(record.xmax) {
            return true;
        }
        if !(txns.is_committed(record.xmax) && snapshot.sees(record.xmax)) {
            // The deleter is still active to this reader.
            return true;
        }
    }

    false
}
