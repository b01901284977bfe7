use criterion::{Criterion, black_box, criterion_group, criterion_main};

use crunsuck::ui::browser::Browser;
use crunsuck::ui::screen::{NodeId, Screen};
use crunsuck::ui::theme::Theme;
use crunsuck::ui::value::Value;
use crunsuck::ui::widget::{Container, Item, Widget};

fn make_screen(rows: usize) -> (Screen<u8, usize>, NodeId) {
    let mut screen = Screen::new(200, 60, Theme::default());
    let root = screen.root();
    let column = screen.vertical(root, Value::fill(), Value::fill()).unwrap();
    let row = screen.horizontal(column, Value::fill(), Value::relative(0.8)).unwrap();
    let left = screen.base(row, Value::relative(0.3), Value::fill()).unwrap();
    let frame = screen
        .add_widget(left, Widget::Container(Container::new(true, Some("Anime"))))
        .unwrap();
    let list = screen.add_widget(frame, Widget::Browser(Browser::new())).unwrap();
    for i in 0..rows {
        if i % 25 == 0 {
            screen.add_heading(list, &format!("Season {}", i / 25 + 1)).unwrap();
        }
        screen.add_item(list, Item::new(format!("{i:>4}   Episode {i}"), i)).unwrap();
    }
    screen
        .add_widget(row, Widget::Container(Container::new(true, Some("Episodes"))))
        .unwrap();
    screen.base(column, Value::fill(), Value::absolute(-1)).unwrap();
    (screen, list)
}

fn bench_full_redraw(c: &mut Criterion) {
    let (mut screen, _) = make_screen(500);
    let root = screen.root();

    c.bench_function("full redraw (500 rows)", |b| {
        b.iter(|| screen.redraw(black_box(root)).unwrap())
    });
}

fn bench_browser_navigation(c: &mut Criterion) {
    let (mut screen, list) = make_screen(500);
    let root = screen.root();
    screen.redraw(root).unwrap();

    c.bench_function("browser down/up sweep (500 rows)", |b| {
        b.iter(|| {
            while screen.browser_down(black_box(list)).unwrap() {}
            while screen.browser_up(black_box(list)).unwrap() {}
        })
    });
}

criterion_group!(benches, bench_full_redraw, bench_browser_navigation);
criterion_main!(benches);
