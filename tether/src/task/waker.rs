use super::core::TaskCore;

use std::mem;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Returns the `RawWakerVTable` for a task producing `T`.
///
/// # Safety
///
/// Every function in the table receives a pointer obtained from
/// `Arc::into_raw` on an `Arc<TaskCore<T>>` and must keep the reference count
/// balanced.
fn vtable<T: Send + 'static>() -> &'static RawWakerVTable {
    &RawWakerVTable::new(
        clone_raw::<T>,
        wake_raw::<T>,
        wake_by_ref_raw::<T>,
        drop_raw::<T>,
    )
}

/// Creates the [`Waker`] handed to a task body while it is polled.
///
/// Waking it resumes the body inline, on the waking thread. It is the
/// continuation a suspended body leaves behind in a result cell.
pub(crate) fn make_waker<T: Send + 'static>(core: Arc<TaskCore<T>>) -> Waker {
    unsafe {
        Waker::from_raw(RawWaker::new(
            Arc::into_raw(core) as *const (),
            vtable::<T>(),
        ))
    }
}

/// Adds one reference to the task core.
fn clone_raw<T: Send + 'static>(ptr: *const ()) -> RawWaker {
    let arc = unsafe { Arc::<TaskCore<T>>::from_raw(ptr as *const TaskCore<T>) };
    let cloned = arc.clone();
    mem::forget(arc);

    RawWaker::new(Arc::into_raw(cloned) as *const (), vtable::<T>())
}

/// Resumes the task and releases this waker's reference.
fn wake_raw<T: Send + 'static>(ptr: *const ()) {
    let arc = unsafe { Arc::<TaskCore<T>>::from_raw(ptr as *const TaskCore<T>) };
    arc.wake();
}

/// Resumes the task, keeping this waker's reference.
fn wake_by_ref_raw<T: Send + 'static>(ptr: *const ()) {
    let arc = unsafe { Arc::<TaskCore<T>>::from_raw(ptr as *const TaskCore<T>) };
    arc.wake();
    mem::forget(arc);
}

/// Releases this waker's reference.
fn drop_raw<T: Send + 'static>(ptr: *const ()) {
    unsafe { Arc::<TaskCore<T>>::from_raw(ptr as *const TaskCore<T>) };
}
