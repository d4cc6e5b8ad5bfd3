//! List view state: filters, sort order and "load more" pagination.

use desk_blob::{Blob, DateRange, ListingQuery, Page, Pagination, SortOrder, TypeFilter};

/// What the file list currently shows. Any filter or sort change starts
/// over at the default page size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileView {
    query: ListingQuery,
    pagination: Pagination,
}

impl FileView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &ListingQuery {
        &self.query
    }

    pub fn visible_count(&self) -> usize {
        self.pagination.visible_count
    }

    pub fn set_type_filter(&mut self, filter: TypeFilter) {
        self.query.type_filter = filter;
        self.pagination.reset();
    }

    pub fn set_search(&mut self, term: &str) {
        self.query = std::mem::take(&mut self.query).with_search(term);
        self.pagination.reset();
    }

    pub fn set_order(&mut self, order: Option<SortOrder>) {
        self.query.order = order;
        self.pagination.reset();
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.query.date_range = range;
        self.pagination.reset();
    }

    pub fn load_more(&mut self) {
        self.pagination.load_more();
    }

    /// Recomputes the page from scratch over `blobs`.
    pub fn visible(&self, blobs: &[Blob]) -> Page {
        self.query.apply_paged(blobs, &self.pagination)
    }

    pub fn has_more(&self, blobs: &[Blob]) -> bool {
        self.pagination
            .has_more(blobs.iter().filter(|b| self.query.matches(b)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_blob::MediaCategory;

    fn blob(name: &str) -> Blob {
        let (created_at, original) = desk_blob::naming::parse_stored_name(name);
        Blob {
            stored_name: name.to_string(),
            original_name: original.to_string(),
            created_at,
            size_bytes: 1,
            access_url: format!("http://localhost/uploads/{name}"),
            category: MediaCategory::classify(name),
            display_name: None,
            description: None,
        }
    }

    fn twelve_images() -> Vec<Blob> {
        (0..12).map(|i| blob(&format!("{}-img{i}.png", 1000 + i))).collect()
    }

    #[test]
    fn shows_ten_then_twelve_after_load_more() {
        let blobs = twelve_images();
        let mut view = FileView::new();

        let page = view.visible(&blobs);
        assert_eq!(page.items.len(), 10);
        assert!(view.has_more(&blobs));

        view.load_more();
        let page = view.visible(&blobs);
        assert_eq!(page.items.len(), 12);
        assert!(!view.has_more(&blobs));
    }

    #[test]
    fn changing_filters_resets_page_size() {
        let mut view = FileView::new();
        view.load_more();
        view.load_more();
        assert_eq!(view.visible_count(), 20);

        view.set_search("img");
        assert_eq!(view.visible_count(), 10);

        view.load_more();
        view.set_order(Some(SortOrder::Recent));
        assert_eq!(view.visible_count(), 10);

        view.load_more();
        view.set_type_filter(TypeFilter::Video);
        assert_eq!(view.visible_count(), 10);
    }

    #[test]
    fn filters_apply_to_visible_page() {
        let mut blobs = twelve_images();
        blobs.push(blob("5000-clip.mp4"));
        blobs.push(blob("6000-notes.txt"));

        let mut view = FileView::new();
        view.set_type_filter(TypeFilter::Video);
        let page = view.visible(&blobs);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].stored_name, "5000-clip.mp4");

        view.set_type_filter(TypeFilter::All);
        view.set_order(Some(SortOrder::Recent));
        let page = view.visible(&blobs);
        assert_eq!(page.total, 14);
        assert_eq!(page.items[0].stored_name, "6000-notes.txt");
    }
}
