pub(crate) mod applications;
pub(crate) mod attendance;
pub(crate) mod audit;
pub(crate) mod courses;
pub(crate) mod enrollments;
pub(crate) mod events;
pub(crate) mod exams;
pub(crate) mod groups;
pub(crate) mod invoices;
pub(crate) mod locks;
pub(crate) mod schedules;
pub(crate) mod sessions;
pub(crate) mod students;
pub(crate) mod timetable;
pub(crate) mod users;
pub(crate) mod waitlist;
